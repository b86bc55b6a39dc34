// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent Hub Daemon (ahd)
//!
//! Supervises AI coding-assistant CLIs in mux panes and republishes
//! their lifecycle as an HTTP + SSE event stream.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use ah_daemon::lifecycle::{self, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ahd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ahd {}", env!("CARGO_PKG_VERSION"));
                println!("Agent Hub Daemon - supervises AI coding agents in mux panes");
                println!();
                println!("USAGE:");
                println!("    ahd");
                println!();
                println!("Listens on the configured HTTP port (default 7070). Options");
                println!("load from ~/.config/ah/config.toml or $AH_CONFIG.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ahd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    init_tracing(&config);

    let state = lifecycle::startup(config).await?;
    lifecycle::run(state).await?;
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("AH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.options.log_level.clone()));
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().unwrap_or(&config.state_dir),
        config
            .log_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "ahd.log".to_string()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file_appender)
        .with_ansi(false)
        .init();
}
