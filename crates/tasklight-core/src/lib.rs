//! Window visibility and global hotkey coordination for the tasklight launcher.
//!
//! A [`WindowRegistry`] owns lazily created windows and decides whether they
//! are shown; a [`HotkeyCoordinator`] owns the one global hotkey and toggles the
//! main window when it fires. Native window calls always go through a
//! [`MainThreadInvoker`], and state changes are announced on an [`EventBus`].

// Re-export commonly used types
pub use global_hotkey::hotkey::Code;

pub mod backend;
pub mod binding;
pub mod coordinator;
mod error;
pub mod events;
pub mod main_thread;
mod spec;
pub mod windows;

#[cfg(test)]
mod testing;

pub use backend::{GlobalHotkeyBackend, HotkeyBackend, HotkeyEvent, HotkeyId};
pub use binding::HotkeyBinding;
pub use coordinator::{HotkeyCoordinator, MAIN_WINDOW};
pub use error::{Error, Result};
pub use events::{AppEvent, EventBus, EventPublisher};
pub use main_thread::{EventLoopInvoker, MainThreadInvoker, MainThreadTask};
pub use spec::{HotkeySpec, Modifier};
pub use windows::{NativeWindow, WindowFactory, WindowHandle, WindowRegistry};
