use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tasklight_core::{AppEvent, EventPublisher, HotkeyCoordinator};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::app::{Poster, SETTINGS_WINDOW, UserEvent};
use crate::config::Config;

/// Background thread reacting to application events and process signals.
///
/// The coordinator's operations block (they join listener threads), so each
/// one is moved onto tokio's blocking pool rather than run on the reactor.
pub struct Glue {
    pub coordinator: Arc<HotkeyCoordinator>,
    pub events: UnboundedReceiver<AppEvent>,
    pub publisher: EventPublisher,
    pub config_path: PathBuf,
    pub poster: Poster,
}

impl Glue {
    pub fn spawn(self) -> Result<()> {
        thread::Builder::new()
            .name("glue".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        self.poster.post(UserEvent::Quit);
                        return;
                    }
                };
                runtime.block_on(self.run());
                debug!("Glue thread exiting");
            })
            .context("Failed to spawn glue thread")?;
        Ok(())
    }

    async fn run(mut self) {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut reload = Reload::new();

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                _ = reload.recv() => self.reload(),
                _ = &mut ctrl_c => {
                    info!("Interrupted, shutting down");
                    self.poster.post(UserEvent::Quit);
                    break;
                }
            }
        }
    }

    async fn handle(&self, event: AppEvent) {
        debug!("Event: {}", event.to_json());
        match event {
            AppEvent::SettingsUpdated { hotkey } => {
                info!("Applying hotkey {}", hotkey);
                let coordinator = self.coordinator.clone();
                self.blocking(move || coordinator.apply_configuration(hotkey))
                    .await;
            }
            AppEvent::WindowVisibilityChanged { id, visible } if id == SETTINGS_WINDOW => {
                let coordinator = self.coordinator.clone();
                if visible {
                    // Let the settings UI capture the combination itself.
                    self.blocking(move || {
                        coordinator.pause();
                        Ok(())
                    })
                    .await;
                } else if self.coordinator.is_paused() {
                    self.blocking(move || coordinator.resume()).await;
                }
            }
            AppEvent::WindowVisibilityChanged { .. } | AppEvent::GlobalHotkeyFired { .. } => {}
        }
    }

    async fn blocking<F>(&self, f: F)
    where
        F: FnOnce() -> tasklight_core::Result<()> + Send + 'static,
    {
        match tokio::task::spawn_blocking(f).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Hotkey update failed: {}", e),
            Err(e) => error!("Hotkey task panicked: {}", e),
        }
    }

    fn reload(&self) {
        info!("Reloading {}", self.config_path.display());
        match Config::load(&self.config_path) {
            Ok(config) => self.publisher.publish(AppEvent::SettingsUpdated {
                hotkey: config.hotkey,
            }),
            Err(e) => warn!("Keeping current settings: {:#}", e),
        }
    }
}

/// SIGHUP where the platform has it; never fires elsewhere.
struct Reload {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl Reload {
    fn new() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let signal = match signal(SignalKind::hangup()) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("Config reload on SIGHUP unavailable: {}", e);
                    None
                }
            };
            Self { signal }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        if let Some(signal) = self.signal.as_mut() {
            if signal.recv().await.is_some() {
                return;
            }
            self.signal = None;
        }
        std::future::pending::<()>().await
    }
}
