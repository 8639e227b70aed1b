use crate::backend::{HotkeyBackend, HotkeyEvent, HotkeyId};
use crate::{Error, HotkeySpec, Result};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Callback invoked on the listener thread once per key-down.
pub type TriggerCallback = Arc<dyn Fn() + Send + Sync>;

struct Listener {
    stopping: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    thread: JoinHandle<()>,
}

impl Listener {
    fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Signal the thread and wait for it to exit.
    fn stop(mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Dropping the only sender disconnects the channel and wakes the select.
        self.stop_tx.take();

        if self.thread.thread().id() == thread::current().id() {
            warn!("Listener asked to stop itself; not waiting for it");
            return;
        }
        if self.thread.join().is_err() {
            error!("Hotkey listener panicked");
        }
    }
}

/// One OS hotkey registration together with the thread that listens for it.
///
/// The spec never changes; a different hotkey means a new binding.
pub struct HotkeyBinding {
    spec: HotkeySpec,
    backend: Arc<dyn HotkeyBackend>,
    id: Option<HotkeyId>,
    listener: Option<Listener>,
}

impl HotkeyBinding {
    /// A binding for `spec` that is neither registered nor listening.
    pub fn new(spec: HotkeySpec, backend: Arc<dyn HotkeyBackend>) -> Self {
        Self {
            spec,
            backend,
            id: None,
            listener: None,
        }
    }

    /// The combination this binding was created for.
    pub fn spec(&self) -> &HotkeySpec {
        &self.spec
    }

    /// Whether the OS currently holds the combination for this binding.
    pub fn is_registered(&self) -> bool {
        self.id.is_some()
    }

    /// Whether a listener thread is still forwarding events. A listener whose
    /// event source failed counts as stopped.
    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(Listener::is_running)
    }

    /// Ask the OS for the combination. Calling it again once registered does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpec` if the key cannot be bound and `HotkeyConflict`
    /// if another application or binding already holds the combination.
    pub fn register(&mut self) -> Result<()> {
        if self.id.is_some() {
            return Ok(());
        }
        self.spec.validate()?;
        let id = self.backend.register(&self.spec)?;
        debug!("Binding {} registered as {}", self.spec, id);
        self.id = Some(id);
        Ok(())
    }

    /// Release the OS reservation, stopping the listener first if it is
    /// still running. Does nothing if not registered.
    pub fn unregister(&mut self) -> Result<()> {
        self.stop_listening();
        match self.id.take() {
            Some(id) => self.backend.unregister(id),
            None => Ok(()),
        }
    }

    /// Spawn the listener thread. `on_trigger` runs on that thread once per
    /// key-down until `stop_listening`.
    ///
    /// # Errors
    ///
    /// Returns `NotRegistered` before a successful `register`, or the
    /// backend's error if its event source or the thread cannot be set up.
    pub fn start_listening(&mut self, on_trigger: TriggerCallback) -> Result<()> {
        let Some(id) = self.id else {
            return Err(Error::NotRegistered(self.spec.clone()));
        };

        if self.is_listening() {
            let err = Error::ListenerAlreadyActive(self.spec.clone());
            debug_assert!(false, "{err}");
            error!("{}; stopping the stale listener", err);
        }
        self.stop_listening();

        let events = self.backend.key_down_events(id)?;
        let stopping = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let spec = self.spec.clone();
        let flag = stopping.clone();
        let thread = thread::Builder::new()
            .name(format!("hotkey-listener-{id}"))
            .spawn(move || listen(spec, events, stop_rx, flag, on_trigger))?;

        self.listener = Some(Listener {
            stopping,
            stop_tx: Some(stop_tx),
            thread,
        });
        Ok(())
    }

    /// Stop the listener and wait until its thread has exited. Safe to call
    /// when nothing is listening.
    pub fn stop_listening(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop();
            debug!("Listener for {} stopped", self.spec);
        }
    }
}

impl Drop for HotkeyBinding {
    fn drop(&mut self) {
        if let Err(e) = self.unregister() {
            warn!("Failed to release hotkey {}: {}", self.spec, e);
        }
    }
}

fn listen(
    spec: HotkeySpec,
    events: Receiver<HotkeyEvent>,
    stop: Receiver<()>,
    stopping: Arc<AtomicBool>,
    on_trigger: TriggerCallback,
) {
    info!("Listening for {}", spec);
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(events) -> event => match event {
                // A stop that raced with a buffered key-down wins.
                Ok(_) if stopping.load(Ordering::SeqCst) => break,
                Ok(_) => on_trigger(),
                Err(_) => {
                    error!("Event source for {} closed, listener exiting", spec);
                    break;
                }
            },
        }
    }
    debug!("Listener for {} exited", spec);
}
