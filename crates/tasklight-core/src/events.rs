//! Application-wide notifications.
//!
//! The core only publishes; who listens and on which thread is up to the
//! composition root. Each subscriber gets its own unbounded channel, so a slow
//! subscriber never blocks the hotkey listener or the window registry.

use crate::HotkeySpec;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Notifications exchanged between the core and the rest of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "kebab-case")]
pub enum AppEvent {
    /// The global hotkey was pressed.
    GlobalHotkeyFired { at: DateTime<Local> },
    /// The registry's belief about a window's visibility changed.
    WindowVisibilityChanged { id: String, visible: bool },
    /// New settings were saved and the hotkey should be re-applied.
    SettingsUpdated { hotkey: HotkeySpec },
}

impl AppEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            AppEvent::GlobalHotkeyFired { .. } => "global-hotkey-fired",
            AppEvent::WindowVisibilityChanged { .. } => "window-visibility-changed",
            AppEvent::SettingsUpdated { .. } => "settings-updated",
        }
    }

    /// The event as a JSON object, for handing to a UI layer.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

type Subscribers = Arc<Mutex<Vec<UnboundedSender<AppEvent>>>>;

/// Fan-out bus: every subscriber receives every event published after it
/// subscribed.
#[derive(Default)]
pub struct EventBus {
    subscribers: Subscribers,
}

impl EventBus {
    /// A bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cloneable handle for publishing from any thread.
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            subscribers: self.subscribers.clone(),
        }
    }

    /// A receiver for every event published from now on. Dropping it
    /// unsubscribes.
    pub fn subscribe(&self) -> UnboundedReceiver<AppEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }
}

/// Publishing side of an [`EventBus`]. Never blocks.
#[derive(Clone)]
pub struct EventPublisher {
    subscribers: Subscribers,
}

impl EventPublisher {
    /// Deliver `event` to every live subscriber. Subscribers whose receiver
    /// was dropped are forgotten.
    pub fn publish(&self, event: AppEvent) {
        trace!(topic = event.topic(), "publishing event");
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
