use thiserror::Error;

use crate::HotkeySpec;

/// The main error type for tasklight-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The OS refused the registration because something else holds the combination
    #[error("Hotkey {0} is already in use")]
    HotkeyConflict(String),

    /// The modifier/key combination cannot be expressed at the OS level
    #[error("Invalid hotkey: {0}")]
    InvalidSpec(String),

    /// A visibility operation named a window with no registered factory
    #[error("No window factory registered for '{0}'")]
    UnknownWindow(String),

    /// `start_listening` was called while a listener was still running
    #[error("Listener already active for {0}")]
    ListenerAlreadyActive(HotkeySpec),

    /// `start_listening` was called before a successful `register`
    #[error("Hotkey {0} is not registered")]
    NotRegistered(HotkeySpec),

    /// Any other failure reported by the hotkey backend
    #[error("Hotkey error: {0}")]
    HotkeyOperation(String),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<global_hotkey::Error> for Error {
    fn from(err: global_hotkey::Error) -> Self {
        match err {
            global_hotkey::Error::AlreadyRegistered(hotkey) => {
                Error::HotkeyConflict(format!("{hotkey:?}"))
            }
            global_hotkey::Error::FailedToRegister(msg) => Error::HotkeyConflict(msg),
            global_hotkey::Error::OsError(e) => Error::Io(e),
            other => Error::HotkeyOperation(other.to_string()),
        }
    }
}
