use crate::{Error, HotkeySpec, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState, hotkey::HotKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, trace, warn};

/// Identifies one OS registration.
pub type HotkeyId = u32;

/// A physical key-down of a registered hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyEvent {
    pub id: HotkeyId,
}

/// The OS global-hotkey primitive.
pub trait HotkeyBackend: Send + Sync {
    /// Reserve the combination. Fails with `HotkeyConflict` if someone else
    /// holds it.
    fn register(&self, spec: &HotkeySpec) -> Result<HotkeyId>;

    /// Release a reservation. Closes the channel handed out by
    /// `key_down_events`.
    fn unregister(&self, id: HotkeyId) -> Result<()>;

    /// Key-down events for a live registration.
    fn key_down_events(&self, id: HotkeyId) -> Result<Receiver<HotkeyEvent>>;
}

struct Route {
    hotkey: HotKey,
    /// Dropped when the event source closes, disconnecting the listener.
    tx: Option<Sender<HotkeyEvent>>,
    /// Handed out once by `key_down_events`.
    rx: Option<Receiver<HotkeyEvent>>,
}

type Routes = Arc<Mutex<HashMap<HotkeyId, Route>>>;

/// `HotkeyBackend` on top of the `global-hotkey` crate.
///
/// `global-hotkey` delivers every event on one process-wide receiver, so a
/// pump thread fans pressed events out to a channel per registration.
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    routes: Routes,
}

impl GlobalHotkeyBackend {
    /// Creates the OS hotkey manager and starts the pump thread.
    ///
    /// On macOS this must be called on the main thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS hotkey manager cannot be created or the
    /// pump thread cannot be spawned.
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new()?;
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));

        let pump_routes = routes.clone();
        let source = GlobalHotKeyEvent::receiver().clone();
        thread::Builder::new()
            .name("hotkey-pump".into())
            .spawn(move || pump(source, pump_routes))?;

        Ok(Self { manager, routes })
    }
}

/// Forward key-downs from `source` to their registration's channel until the
/// source closes, then disconnect every registration.
fn pump(source: Receiver<GlobalHotKeyEvent>, routes: Routes) {
    while let Ok(event) = source.recv() {
        if event.state != HotKeyState::Pressed {
            continue;
        }
        let routes = routes.lock();
        match routes.get(&event.id).and_then(|route| route.tx.as_ref()) {
            Some(tx) => {
                trace!("Hotkey {} pressed", event.id);
                let _ = tx.send(HotkeyEvent { id: event.id });
            }
            None => debug!("Dropping event for unregistered hotkey {}", event.id),
        }
    }

    warn!("Global hotkey event source closed");
    for route in routes.lock().values_mut() {
        route.tx = None;
    }
}

/// Drop the route for `id` once `os_unregister` has released it. On failure
/// the route stays, so a retry or `Drop` can still release the hotkey.
fn release(
    routes: &Routes,
    id: HotkeyId,
    os_unregister: impl FnOnce(HotKey) -> Result<()>,
) -> Result<()> {
    let mut routes = routes.lock();
    let Some(route) = routes.get(&id) else {
        return Ok(());
    };
    os_unregister(route.hotkey)?;
    routes.remove(&id);
    info!("Unregistered global hotkey {}", id);
    Ok(())
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&self, spec: &HotkeySpec) -> Result<HotkeyId> {
        spec.validate()?;
        let hotkey = spec.to_hotkey();
        self.manager.register(hotkey)?;

        let id = hotkey.id();
        let (tx, rx) = unbounded();
        self.routes.lock().insert(
            id,
            Route {
                hotkey,
                tx: Some(tx),
                rx: Some(rx),
            },
        );
        info!("Registered global hotkey {} (id: {})", spec, id);
        Ok(id)
    }

    fn unregister(&self, id: HotkeyId) -> Result<()> {
        release(&self.routes, id, |hotkey| {
            self.manager.unregister(hotkey)?;
            Ok(())
        })
    }

    fn key_down_events(&self, id: HotkeyId) -> Result<Receiver<HotkeyEvent>> {
        let mut routes = self.routes.lock();
        let route = routes
            .get_mut(&id)
            .ok_or_else(|| Error::HotkeyOperation(format!("Hotkey {id} is not registered")))?;
        route.rx.take().ok_or_else(|| {
            Error::HotkeyOperation(format!("Events for hotkey {id} were already taken"))
        })
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        for (_, route) in self.routes.lock().drain() {
            let _ = self.manager.unregister(route.hotkey);
        }
    }
}
