//! Lazily created windows and the registry's belief about their visibility.
//!
//! All bookkeeping happens under one reader/writer lock. Native calls are
//! never made while that lock is held, because the toolkit's close callback
//! re-enters the registry. They are queued on the main thread before the lock
//! is released, so the queue order always matches the order of the recorded
//! decisions.

use crate::events::{AppEvent, EventPublisher};
use crate::main_thread::MainThreadInvoker;
use crate::Error;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A native window as seen by the registry.
///
/// Methods are only ever called from a main-thread task.
pub trait NativeWindow: Send + Sync {
    fn show(&self);
    fn hide(&self);
    fn focus(&self);
}

pub type WindowHandle = Arc<dyn NativeWindow>;

/// Builds a fresh native window for an id.
pub type WindowFactory = Arc<dyn Fn() -> WindowHandle + Send + Sync>;

#[derive(Default)]
struct Windows {
    factories: HashMap<String, WindowFactory>,
    handles: HashMap<String, WindowHandle>,
    visible: HashMap<String, bool>,
}

impl Windows {
    /// Return the live handle for `id`, building one with the stored factory if
    /// needed. Must be called with the write lock held so concurrent callers
    /// converge on a single window.
    fn materialize(&mut self, id: &str) -> Option<WindowHandle> {
        if let Some(handle) = self.handles.get(id) {
            return Some(handle.clone());
        }

        let Some(factory) = self.factories.get(id) else {
            warn!("{}", Error::UnknownWindow(id.to_string()));
            return None;
        };

        info!("Creating window '{}'", id);
        let handle = factory();
        self.handles.insert(id.to_string(), handle.clone());
        self.visible.insert(id.to_string(), false);
        Some(handle)
    }
}

enum NativeCall {
    ShowAndFocus,
    Hide,
}

/// Single source of truth for which windows exist and whether they are shown.
pub struct WindowRegistry {
    windows: RwLock<Windows>,
    invoker: Arc<dyn MainThreadInvoker>,
    events: EventPublisher,
}

impl WindowRegistry {
    /// An empty registry. `invoker` must queue tasks rather than run them
    /// inline; the registry calls it while holding its lock.
    pub fn new(invoker: Arc<dyn MainThreadInvoker>, events: EventPublisher) -> Self {
        Self {
            windows: RwLock::new(Windows::default()),
            invoker,
            events,
        }
    }

    /// Store the constructor for `id`, replacing any previous one.
    ///
    /// A window that already exists keeps running; the new factory is used
    /// the next time the window has to be created.
    pub fn register_factory<F>(&self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> WindowHandle + Send + Sync + 'static,
    {
        let id = id.into();
        debug!("Registering window factory '{}'", id);
        self.windows.write().factories.insert(id, Arc::new(factory));
    }

    /// Show and focus `id`, creating the window first if needed.
    pub fn show(&self, id: &str) {
        let mut windows = self.windows.write();
        let Some(handle) = windows.materialize(id) else {
            return;
        };
        let was_visible = windows.visible.insert(id.to_string(), true);

        self.dispatch(handle, NativeCall::ShowAndFocus);
        if was_visible != Some(true) {
            self.notify(id, true);
        }
    }

    /// Hide `id` if it exists and is believed visible.
    pub fn hide(&self, id: &str) {
        let mut windows = self.windows.write();
        let Some(handle) = windows.handles.get(id).cloned() else {
            debug!("Hide for window '{}' that was never created", id);
            return;
        };
        match windows.visible.get_mut(id) {
            Some(visible) if *visible => *visible = false,
            _ => return,
        }

        self.dispatch(handle, NativeCall::Hide);
        self.notify(id, false);
    }

    /// Flip the visibility of `id`, creating the window first if needed.
    ///
    /// The direction is decided, recorded and queued in one critical section,
    /// so concurrent toggles always alternate and reach the main thread in the
    /// order they were decided.
    pub fn toggle_visibility(&self, id: &str) {
        let mut windows = self.windows.write();
        let Some(handle) = windows.materialize(id) else {
            return;
        };
        let visible = windows.visible.entry(id.to_string()).or_insert(false);
        *visible = !*visible;
        let visible = *visible;

        let call = if visible {
            NativeCall::ShowAndFocus
        } else {
            NativeCall::Hide
        };
        self.dispatch(handle, call);
        self.notify(id, visible);
    }

    /// The registry's belief about `id`. Never touches the native layer, so
    /// it can run ahead of a queued show or hide.
    pub fn is_visible(&self, id: &str) -> bool {
        self.windows.read().visible.get(id).copied().unwrap_or(false)
    }

    /// Whether a native window currently exists for `id`.
    pub fn is_materialized(&self, id: &str) -> bool {
        self.windows.read().handles.contains_key(id)
    }

    /// The native layer closed `id`. The handle is discarded so the next
    /// `show` builds a fresh window.
    pub fn window_closed(&self, id: &str) {
        let mut windows = self.windows.write();
        windows.handles.remove(id);
        let was_visible = windows.visible.remove(id);

        info!("Window '{}' closed", id);
        if was_visible == Some(true) {
            self.notify(id, false);
        }
    }

    /// Queue `call` for the main thread. Called with the write lock held:
    /// queuing never blocks and never runs the task inline.
    fn dispatch(&self, handle: WindowHandle, call: NativeCall) {
        self.invoker.run_on_main_thread(Box::new(move || match call {
            NativeCall::ShowAndFocus => {
                handle.show();
                handle.focus();
            }
            NativeCall::Hide => handle.hide(),
        }));
    }

    fn notify(&self, id: &str, visible: bool) {
        self.events.publish(AppEvent::WindowVisibilityChanged {
            id: id.to_string(),
            visible,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::testing::{CountingWindow, NativeOp, QueuedInvoker};
    use crate::main_thread::MainThreadTask;
    use crossbeam_channel::{Receiver, Sender, unbounded};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    struct Fixture {
        registry: Arc<WindowRegistry>,
        invoker: Arc<QueuedInvoker>,
        window: Arc<CountingWindow>,
        created: Arc<AtomicUsize>,
        bus: EventBus,
    }

    fn fixture() -> Fixture {
        let bus = EventBus::new();
        let invoker = Arc::new(QueuedInvoker::default());
        let registry = Arc::new(WindowRegistry::new(invoker.clone(), bus.publisher()));
        let window = Arc::new(CountingWindow::default());
        let created = Arc::new(AtomicUsize::new(0));

        let factory_window = window.clone();
        let factory_created = created.clone();
        registry.register_factory("main", move || {
            factory_created.fetch_add(1, Ordering::SeqCst);
            factory_window.clone() as WindowHandle
        });

        Fixture {
            registry,
            invoker,
            window,
            created,
            bus,
        }
    }

    #[test]
    fn test_show_schedules_show_and_focus() {
        let f = fixture();
        let mut events = f.bus.subscribe();

        f.registry.show("main");
        assert!(f.registry.is_visible("main"));
        assert_eq!(f.invoker.pending(), 1);
        assert!(f.window.ops().is_empty());

        f.invoker.run_pending();
        assert_eq!(f.window.ops(), vec![NativeOp::Show, NativeOp::Focus]);
        assert_eq!(
            events.try_recv().unwrap(),
            AppEvent::WindowVisibilityChanged {
                id: "main".into(),
                visible: true
            }
        );
    }

    #[test]
    fn test_show_unknown_window_is_ignored() {
        let f = fixture();
        f.registry.show("nope");
        f.registry.toggle_visibility("nope");
        f.registry.hide("nope");
        assert!(!f.registry.is_visible("nope"));
        assert!(!f.registry.is_materialized("nope"));
        assert_eq!(f.invoker.pending(), 0);
    }

    #[test]
    fn test_hide_is_idempotent() {
        let f = fixture();
        f.registry.show("main");
        f.invoker.run_pending();

        f.registry.hide("main");
        f.registry.hide("main");
        assert!(!f.registry.is_visible("main"));
        assert_eq!(f.invoker.pending(), 1);

        f.invoker.run_pending();
        assert_eq!(
            f.window.ops(),
            vec![NativeOp::Show, NativeOp::Focus, NativeOp::Hide]
        );
    }

    #[test]
    fn test_hide_before_materialization_is_noop() {
        let f = fixture();
        f.registry.hide("main");
        assert_eq!(f.created.load(Ordering::SeqCst), 0);
        assert_eq!(f.invoker.pending(), 0);
    }

    #[test]
    fn test_toggle_alternates() {
        let f = fixture();
        let mut seen = Vec::new();
        for _ in 0..5 {
            f.registry.toggle_visibility("main");
            seen.push(f.registry.is_visible("main"));
        }
        assert_eq!(seen, vec![true, false, true, false, true]);

        f.invoker.run_pending();
        assert_eq!(
            f.window.ops(),
            vec![
                NativeOp::Show,
                NativeOp::Focus,
                NativeOp::Hide,
                NativeOp::Show,
                NativeOp::Focus,
                NativeOp::Hide,
                NativeOp::Show,
                NativeOp::Focus,
            ]
        );
        assert_eq!(f.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_toggles_stay_consistent() {
        let f = fixture();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = f.registry.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        registry.toggle_visibility("main");
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        // 200 flips from hidden end hidden.
        assert!(!f.registry.is_visible("main"));
        assert_eq!(f.invoker.pending(), 200);
    }

    #[test]
    fn test_concurrent_show_materializes_once() {
        let f = fixture();
        let barrier = Arc::new(Barrier::new(16));
        let threads: Vec<_> = (0..16)
            .map(|_| {
                let registry = f.registry.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry.show("main");
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(f.created.load(Ordering::SeqCst), 1);
        assert!(f.registry.is_visible("main"));
    }

    #[test]
    fn test_close_purges_and_rematerializes() {
        let f = fixture();
        let mut events = f.bus.subscribe();
        f.registry.show("main");
        f.registry.window_closed("main");

        assert!(!f.registry.is_visible("main"));
        assert!(!f.registry.is_materialized("main"));

        f.registry.show("main");
        assert_eq!(f.created.load(Ordering::SeqCst), 2);
        assert!(f.registry.is_visible("main"));

        let visibility: Vec<bool> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|e| match e {
                AppEvent::WindowVisibilityChanged { visible, .. } => Some(visible),
                _ => None,
            })
            .collect();
        assert_eq!(visibility, vec![true, false, true]);
    }

    #[test]
    fn test_window_lost_before_queued_show_is_rebuilt() {
        // The native window can vanish before its queued show runs, e.g. when
        // the toolkit fails to build it.
        let f = fixture();
        let mut events = f.bus.subscribe();
        f.registry.show("main");
        f.registry.window_closed("main");
        f.invoker.run_pending();

        assert!(!f.registry.is_materialized("main"));
        assert!(!f.registry.is_visible("main"));

        f.registry.show("main");
        assert_eq!(f.created.load(Ordering::SeqCst), 2);
        assert!(f.registry.is_visible("main"));

        let visibility: Vec<bool> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|e| match e {
                AppEvent::WindowVisibilityChanged { visible, .. } => Some(visible),
                _ => None,
            })
            .collect();
        assert_eq!(visibility, vec![true, false, true]);
    }

    #[test]
    fn test_replacing_factory_keeps_existing_window() {
        let f = fixture();
        f.registry.show("main");

        let replaced = Arc::new(AtomicUsize::new(0));
        let counter = replaced.clone();
        f.registry.register_factory("main", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(CountingWindow::default()) as WindowHandle
        });

        f.registry.hide("main");
        f.registry.show("main");
        assert_eq!(replaced.load(Ordering::SeqCst), 0);

        f.registry.window_closed("main");
        f.registry.show("main");
        assert_eq!(replaced.load(Ordering::SeqCst), 1);
        assert_eq!(f.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_show_when_visible_refocuses_without_event() {
        let f = fixture();
        let mut events = f.bus.subscribe();
        f.registry.show("main");
        f.registry.show("main");
        assert_eq!(f.invoker.pending(), 2);
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    /// Holds up the first task it is given until released, or for at most
    /// half a second.
    struct StallingInvoker {
        inner: QueuedInvoker,
        stalled: AtomicBool,
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl MainThreadInvoker for StallingInvoker {
        fn run_on_main_thread(&self, task: MainThreadTask) {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                let _ = self.entered.send(());
                let _ = self.release.recv_timeout(Duration::from_millis(500));
            }
            self.inner.run_on_main_thread(task);
        }
    }

    #[test]
    fn test_racing_toggles_reach_main_thread_in_decision_order() {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let invoker = Arc::new(StallingInvoker {
            inner: QueuedInvoker::default(),
            stalled: AtomicBool::new(false),
            entered: entered_tx,
            release: release_rx,
        });
        let bus = EventBus::new();
        let mut events = bus.subscribe();
        let registry = Arc::new(WindowRegistry::new(invoker.clone(), bus.publisher()));
        let window = Arc::new(CountingWindow::default());
        let factory_window = window.clone();
        registry.register_factory("main", move || factory_window.clone() as WindowHandle);

        let first = {
            let registry = registry.clone();
            thread::spawn(move || registry.toggle_visibility("main"))
        };
        entered_rx.recv().unwrap();

        // The first toggle is stuck queuing its show; a second toggle must
        // not overtake it.
        let second = {
            let registry = registry.clone();
            thread::spawn(move || {
                registry.toggle_visibility("main");
                let _ = release_tx.send(());
            })
        };
        first.join().unwrap();
        second.join().unwrap();

        invoker.inner.run_pending();
        assert!(!registry.is_visible("main"));
        assert_eq!(
            window.ops(),
            vec![NativeOp::Show, NativeOp::Focus, NativeOp::Hide]
        );

        let published: Vec<bool> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|e| match e {
                AppEvent::WindowVisibilityChanged { visible, .. } => Some(visible),
                _ => None,
            })
            .collect();
        assert_eq!(published, vec![true, false]);
    }
}
