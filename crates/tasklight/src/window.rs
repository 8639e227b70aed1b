use std::sync::Arc;

use parking_lot::Mutex;
use tao::dpi::LogicalSize;
use tao::error::OsError;
use tao::event_loop::EventLoopWindowTarget;
use tao::window::{Window, WindowBuilder, WindowId};
use tasklight_core::NativeWindow;
use tracing::{debug, warn};

use crate::config::WindowConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// Frameless, fixed-size, floating text input
    Input,
    /// Ordinary decorated window
    Settings,
}

/// A registry handle for a `tao` window.
///
/// The handle exists as soon as the registry's factory runs, but the native
/// window is only built once the event loop processes the matching
/// materialize event on the main thread.
pub struct LauncherWindow {
    name: String,
    kind: WindowKind,
    config: WindowConfig,
    window: Mutex<Option<Window>>,
}

impl LauncherWindow {
    pub fn new(name: impl Into<String>, kind: WindowKind, config: WindowConfig) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
            config,
            window: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the native window. Main thread only.
    pub fn build<T: 'static>(
        &self,
        target: &EventLoopWindowTarget<T>,
    ) -> Result<WindowId, OsError> {
        let mut builder = WindowBuilder::new()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
            .with_visible(false);

        builder = match self.kind {
            WindowKind::Input => builder
                .with_decorations(false)
                .with_resizable(false)
                .with_always_on_top(true),
            WindowKind::Settings => builder.with_resizable(true),
        };

        let window = builder.build(target)?;
        let id = window.id();
        debug!("Built native window '{}' ({:?})", self.name, id);
        *self.window.lock() = Some(window);
        Ok(id)
    }

    /// Drop the native window, closing it.
    pub fn destroy(&self) {
        self.window.lock().take();
    }

    fn with_window(&self, f: impl FnOnce(&Window)) {
        match self.window.lock().as_ref() {
            Some(window) => f(window),
            None => warn!("Window '{}' has no native window", self.name),
        }
    }
}

impl NativeWindow for LauncherWindow {
    fn show(&self) {
        self.with_window(|w| w.set_visible(true));
    }

    fn hide(&self) {
        self.with_window(|w| w.set_visible(false));
    }

    fn focus(&self) {
        self.with_window(|w| w.set_focus());
    }
}
