// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use powerlog::clock::now_secs;
use powerlog_maint::config::MaintConfig;

fn main() {
    let config = MaintConfig::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match powerlog_maint::run(&config, now_secs()) {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(powerlog_maint::error_exit_code(&e));
        }
    }
}
