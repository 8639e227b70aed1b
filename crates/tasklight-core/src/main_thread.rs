use parking_lot::Mutex;
use tao::event_loop::EventLoopProxy;
use tracing::debug;

/// A unit of work that must run on the UI thread.
pub type MainThreadTask = Box<dyn FnOnce() + Send + 'static>;

/// The host toolkit's way of getting work onto its main thread.
///
/// Implementations queue the task and return immediately; the task runs some
/// time later on the thread that owns the native windows.
pub trait MainThreadInvoker: Send + Sync {
    fn run_on_main_thread(&self, task: MainThreadTask);
}

/// Posts tasks to a running `tao` event loop as user events.
///
/// The loop's user event type only has to be constructible from a task; the
/// event handler is expected to run it when the event arrives.
pub struct EventLoopInvoker<T: 'static> {
    proxy: Mutex<EventLoopProxy<T>>,
}

impl<T: 'static> EventLoopInvoker<T> {
    pub fn new(proxy: EventLoopProxy<T>) -> Self {
        Self {
            proxy: Mutex::new(proxy),
        }
    }
}

impl<T> MainThreadInvoker for EventLoopInvoker<T>
where
    T: From<MainThreadTask> + Send + 'static,
{
    fn run_on_main_thread(&self, task: MainThreadTask) {
        if self.proxy.lock().send_event(T::from(task)).is_err() {
            // The loop is gone; there is no main thread left to run on.
            debug!("Event loop closed, dropping main thread task");
        }
    }
}
