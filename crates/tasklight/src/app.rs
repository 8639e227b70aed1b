use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tao::event::{Event, StartCause, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use tao::window::WindowId;
use tasklight_core::{
    EventBus, EventLoopInvoker, GlobalHotkeyBackend, HotkeyCoordinator, MAIN_WINDOW,
    MainThreadTask, WindowHandle, WindowRegistry,
};
use tracing::{debug, error, info, trace};

use crate::config::{Config, WindowConfig};
use crate::glue::Glue;
use crate::window::{LauncherWindow, WindowKind};

pub const SETTINGS_WINDOW: &str = "settings";

/// Work posted to the main thread.
pub enum UserEvent {
    /// Run a task for the window registry.
    Run(MainThreadTask),
    /// Build the native window behind a freshly created registry handle.
    Materialize(Arc<LauncherWindow>),
    Quit,
}

impl From<MainThreadTask> for UserEvent {
    fn from(task: MainThreadTask) -> Self {
        UserEvent::Run(task)
    }
}

impl fmt::Debug for UserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserEvent::Run(_) => write!(f, "Run"),
            UserEvent::Materialize(w) => write!(f, "Materialize({})", w.name()),
            UserEvent::Quit => write!(f, "Quit"),
        }
    }
}

/// Posts `UserEvent`s from any thread.
#[derive(Clone)]
pub struct Poster {
    proxy: Arc<Mutex<EventLoopProxy<UserEvent>>>,
}

impl Poster {
    fn new(proxy: EventLoopProxy<UserEvent>) -> Self {
        Self {
            proxy: Arc::new(Mutex::new(proxy)),
        }
    }

    pub fn post(&self, event: UserEvent) {
        if self.proxy.lock().send_event(event).is_err() {
            debug!("Event loop closed, dropping user event");
        }
    }
}

/// Startup options that do not live in the config file.
pub struct Options {
    pub config_path: PathBuf,
    pub open_settings: bool,
}

fn register_window(
    registry: &WindowRegistry,
    poster: &Poster,
    name: &'static str,
    kind: WindowKind,
    config: WindowConfig,
) {
    let poster = poster.clone();
    registry.register_factory(name, move || {
        let window = LauncherWindow::new(name, kind, config.clone());
        poster.post(UserEvent::Materialize(window.clone()));
        window as WindowHandle
    });
}

/// Run the launcher until it is asked to quit.
///
/// This creates the `tao` event loop on the current thread (which must be the
/// main thread on macOS), wires the window registry and hotkey coordinator to
/// it, starts the glue thread and never returns.
pub fn run(config: Config, options: Options) -> Result<()> {
    #[allow(unused_mut)]
    let mut event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

    #[cfg(target_os = "macos")]
    {
        use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
        // Menu-bar app: no Dock icon, no Cmd+Tab entry.
        event_loop.set_activation_policy(ActivationPolicy::Accessory);
    }

    let poster = Poster::new(event_loop.create_proxy());
    let invoker = Arc::new(EventLoopInvoker::new(event_loop.create_proxy()));

    let bus = EventBus::new();
    let registry = Arc::new(WindowRegistry::new(invoker, bus.publisher()));
    register_window(
        &registry,
        &poster,
        MAIN_WINDOW,
        WindowKind::Input,
        config.main_window.clone(),
    );
    register_window(
        &registry,
        &poster,
        SETTINGS_WINDOW,
        WindowKind::Settings,
        config.settings_window.clone(),
    );

    debug!("Creating global hotkey backend");
    let backend = Arc::new(GlobalHotkeyBackend::new().context("Failed to create hotkey backend")?);
    let coordinator = Arc::new(HotkeyCoordinator::new(
        backend,
        registry.clone(),
        bus.publisher(),
    ));

    Glue {
        coordinator: coordinator.clone(),
        events: bus.subscribe(),
        publisher: bus.publisher(),
        config_path: options.config_path,
        poster: poster.clone(),
    }
    .spawn()?;

    let mut open: HashMap<WindowId, Arc<LauncherWindow>> = HashMap::new();

    info!("Starting tao event loop");
    event_loop.run(move |event, target, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(StartCause::Init) => {
                if let Err(e) = coordinator.apply_configuration(config.hotkey.clone()) {
                    error!("Running without a global hotkey: {}", e);
                }
                if config.show_on_startup {
                    registry.show(MAIN_WINDOW);
                }
                if options.open_settings {
                    registry.show(SETTINGS_WINDOW);
                }
            }
            Event::UserEvent(UserEvent::Run(task)) => task(),
            Event::UserEvent(UserEvent::Materialize(window)) => match window.build(target) {
                Ok(id) => {
                    open.insert(id, window);
                }
                Err(e) => {
                    error!("Failed to create window '{}': {}", window.name(), e);
                    // Forget the dead handle so the next show tries again.
                    registry.window_closed(window.name());
                }
            },
            Event::UserEvent(UserEvent::Quit) => {
                info!("Quit requested, exiting event loop");
                *control_flow = ControlFlow::Exit;
            }
            Event::WindowEvent {
                window_id,
                event: WindowEvent::CloseRequested,
                ..
            } => {
                if let Some(window) = open.remove(&window_id) {
                    window.destroy();
                    registry.window_closed(window.name());
                }
            }
            Event::WindowEvent {
                window_id,
                event: WindowEvent::Focused(false),
                ..
            } => {
                let is_main = open
                    .get(&window_id)
                    .is_some_and(|w| w.name() == MAIN_WINDOW);
                if is_main && config.hide_on_blur {
                    registry.hide(MAIN_WINDOW);
                }
            }
            Event::LoopDestroyed => {
                info!("Event loop destroyed, releasing hotkey");
                coordinator.shutdown();
            }
            Event::NewEvents(_) | Event::MainEventsCleared | Event::RedrawEventsCleared => {}
            other => trace!("Event loop received: {:?}", other),
        }
    })
}
