use crate::backend::HotkeyBackend;
use crate::binding::{HotkeyBinding, TriggerCallback};
use crate::events::{AppEvent, EventPublisher};
use crate::windows::WindowRegistry;
use crate::{HotkeySpec, Result};
use chrono::Local;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The window a hotkey press toggles unless told otherwise.
pub const MAIN_WINDOW: &str = "main";

#[derive(Default)]
struct State {
    current: Option<HotkeyBinding>,
    paused: Option<HotkeySpec>,
}

/// Owns the single live hotkey binding.
///
/// Reconfiguration, pause and resume are serialized on one mutex. The trigger
/// callback never takes that mutex, so waiting for a listener to stop while
/// holding it cannot deadlock.
pub struct HotkeyCoordinator {
    backend: Arc<dyn HotkeyBackend>,
    windows: Arc<WindowRegistry>,
    events: EventPublisher,
    target: String,
    state: Mutex<State>,
}

impl HotkeyCoordinator {
    /// A coordinator with no hotkey. Presses will toggle [`MAIN_WINDOW`] in
    /// `windows`, and notifications go to `events`.
    pub fn new(
        backend: Arc<dyn HotkeyBackend>,
        windows: Arc<WindowRegistry>,
        events: EventPublisher,
    ) -> Self {
        Self {
            backend,
            windows,
            events,
            target: MAIN_WINDOW.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Toggle `id` on hotkey presses instead of the main window.
    pub fn with_target_window(mut self, id: impl Into<String>) -> Self {
        self.target = id.into();
        self
    }

    /// Replace the active hotkey with `spec`.
    ///
    /// The old listener is fully stopped before the old registration is
    /// released, and both happen before the new hotkey is registered. If
    /// registration fails the error is returned and no hotkey is active.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpec` or `HotkeyConflict` from registration. A listener
    /// that fails to start is logged, not returned; the hotkey then stays
    /// registered but inactive.
    pub fn apply_configuration(&self, spec: HotkeySpec) -> Result<()> {
        let mut state = self.state.lock();
        info!("Applying hotkey {}", spec);
        state.paused = None;
        self.teardown(&mut state);
        self.install(&mut state, spec)
    }

    /// Stop listening and release the hotkey, remembering it for `resume`.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        let Some(spec) = state.current.as_ref().map(|b| b.spec().clone()) else {
            return;
        };
        info!("Pausing hotkey {}", spec);
        self.teardown(&mut state);
        state.paused = Some(spec);
    }

    /// Re-install the hotkey saved by `pause`. Does nothing if not paused.
    ///
    /// A failed resume is reported like a failed `apply_configuration` and is
    /// not retried.
    pub fn resume(&self) -> Result<()> {
        let mut state = self.state.lock();
        let Some(spec) = state.paused.take() else {
            return Ok(());
        };
        info!("Resuming hotkey {}", spec);
        self.teardown(&mut state);
        self.install(&mut state, spec)
    }

    /// Release the hotkey for good.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.paused = None;
        self.teardown(&mut state);
    }

    /// The spec of the live binding, if any.
    pub fn current_spec(&self) -> Option<HotkeySpec> {
        self.state
            .lock()
            .current
            .as_ref()
            .map(|b| b.spec().clone())
    }

    /// Whether a press would currently reach the target window.
    pub fn is_listening(&self) -> bool {
        self.state
            .lock()
            .current
            .as_ref()
            .is_some_and(HotkeyBinding::is_listening)
    }

    /// Whether `pause` saved a hotkey that `resume` has not yet restored.
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused.is_some()
    }

    fn teardown(&self, state: &mut State) {
        let Some(mut binding) = state.current.take() else {
            return;
        };
        binding.stop_listening();
        // The old binding is going away regardless; a failed release must not
        // keep the user from getting the new one.
        if let Err(e) = binding.unregister() {
            warn!("Failed to unregister hotkey {}: {}", binding.spec(), e);
        }
    }

    fn install(&self, state: &mut State, spec: HotkeySpec) -> Result<()> {
        let mut binding = HotkeyBinding::new(spec, self.backend.clone());
        if let Err(e) = binding.register() {
            error!("Failed to register hotkey {}: {}", binding.spec(), e);
            return Err(e);
        }

        if let Err(e) = binding.start_listening(self.trigger()) {
            error!(
                "Hotkey {} registered but listener failed to start: {}",
                binding.spec(),
                e
            );
        } else {
            info!("Hotkey {} active", binding.spec());
        }
        state.current = Some(binding);
        Ok(())
    }

    fn trigger(&self) -> TriggerCallback {
        let windows = self.windows.clone();
        let events = self.events.clone();
        let target = self.target.clone();
        Arc::new(move || {
            windows.toggle_visibility(&target);
            events.publish(AppEvent::GlobalHotkeyFired { at: Local::now() });
        })
    }
}

impl Drop for HotkeyCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
