// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration paths, startup, shutdown.

use ah_adapters::{MuxAdapter, MuxError, ProviderRegistry, Tmux};
use ah_core::{AhConfig, Subscription, SystemClock};
use ah_engine::{Manager, Poller, WebhookDispatcher};
use ah_engine::manager::ManagerDeps;
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Manager with the production adapter types.
pub type DaemonManager = Manager<Tmux, SystemClock>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no home directory available")]
    NoHome,
    #[error("another daemon holds the lock at {0}")]
    Locked(PathBuf),
    #[error("mux binary not installed (install tmux and retry)")]
    MuxMissing,
    #[error(transparent)]
    Config(#[from] ah_core::config::ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Mux(#[from] MuxError),
}

/// Filesystem layout and loaded options.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/ah)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
    /// Loaded and normalized options
    pub options: AhConfig,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// State lives under `$XDG_STATE_HOME/ah` (default ~/.local/state/ah);
    /// options come from `$AH_CONFIG` or `~/.config/ah/config.toml`.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        std::fs::create_dir_all(&state_dir)?;

        let config_path = std::env::var("AH_CONFIG").map(PathBuf::from).ok().or_else(|| {
            dirs::config_dir().map(|d| d.join("ah").join("config.toml"))
        });
        let options = match config_path {
            Some(ref path) if path.exists() => {
                AhConfig::from_toml(&std::fs::read_to_string(path)?)?
            }
            _ => AhConfig::default(),
        };

        Ok(Self {
            lock_path: state_dir.join("ahd.pid"),
            log_path: state_dir.join("ahd.log"),
            state_dir,
            options,
        })
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("AH_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .map(|d| d.join("ah"))
        .ok_or(LifecycleError::NoHome)
}

/// Running daemon state.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub manager: DaemonManager,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub cancel: CancellationToken,
    pub start_time: Instant,
}

/// Acquire the lock, verify the mux, and assemble the engine.
///
/// A missing mux binary at startup is fatal; at runtime the poller
/// degrades instead.
pub async fn startup(config: Config) -> Result<DaemonState, LifecycleError> {
    let lock_file = acquire_lock(&config.lock_path)?;

    let mux = Tmux::new();
    match mux.list_sessions(&config.options.mux_prefix).await {
        Ok(_) => {}
        Err(MuxError::MuxNotInstalled) => return Err(LifecycleError::MuxMissing),
        Err(e) => {
            tracing::warn!(error = %e, "mux probe failed at startup, continuing");
        }
    }

    let subscriptions = load_subscriptions(&config.state_dir);
    let manager = Manager::new(ManagerDeps {
        mux,
        clock: SystemClock,
        registry: ProviderRegistry::builtin(),
        config: config.options.clone(),
        state_dir: config.state_dir.clone(),
        subscriptions,
    });

    let cancel = CancellationToken::new();
    let dispatcher = Arc::new(WebhookDispatcher::start(
        manager.bus().clone(),
        manager.store().clone(),
        config.options.webhook.clone(),
        cancel.clone(),
    ));

    Ok(DaemonState {
        config,
        lock_file,
        manager,
        dispatcher,
        cancel,
        start_time: Instant::now(),
    })
}

/// Run until a shutdown signal: poller loop + HTTP server.
pub async fn run(state: DaemonState) -> Result<(), LifecycleError> {
    let poller = Poller::new(state.manager.clone());
    let poller_cancel = state.cancel.clone();
    let poller_handle = tokio::spawn(poller.run(poller_cancel));

    let app_state = crate::http::AppState {
        manager: state.manager.clone(),
        dispatcher: Arc::clone(&state.dispatcher),
        start_time: state.start_time,
        auth_token: state.config.options.auth.token.clone(),
    };
    let router = crate::http::router(app_state);

    let addr = format!(
        "{}:{}",
        state.config.options.bind_address, state.config.options.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "daemon listening");

    let cancel = state.cancel.clone();
    spawn_signal_handler(cancel.clone());

    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // The poller finishes its in-flight cycle before exiting
    let _ = poller_handle.await;
    tracing::info!("daemon stopped");
    Ok(())
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let sigint = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    let _ = sigint.await;
                    cancel.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = sigint => tracing::info!("SIGINT received"),
                _ = sigterm.recv() => tracing::info!("SIGTERM received"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = sigint.await;
        }
        cancel.cancel();
    });
}

fn acquire_lock(path: &PathBuf) -> Result<File, LifecycleError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    if file.try_lock_exclusive().is_err() {
        return Err(LifecycleError::Locked(path.clone()));
    }
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Opaque subscription records dropped off by the credential-discovery
/// layer. Absent file means no subscriptions.
fn load_subscriptions(state_dir: &std::path::Path) -> Vec<Subscription> {
    let path = state_dir.join("subscriptions.json");
    let Ok(text) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    match serde_json::from_str(&text) {
        Ok(subscriptions) => subscriptions,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "subscriptions file unreadable, ignoring");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
