// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::hook::RetryPolicy;

/// Scheduling configuration for the refresh clock and hook installer.
#[derive(Debug, Clone, clap::Args)]
pub struct ClockConfig {
    /// Countdown tick interval in milliseconds.
    #[arg(long, default_value_t = 500, env = "TOKENCLOCK_TICK_MS")]
    pub tick_ms: u64,

    /// Delay between attempts to locate the authorize entry point.
    #[arg(long, default_value_t = 1000, env = "TOKENCLOCK_INSTALL_RETRY_MS")]
    pub install_retry_ms: u64,

    /// Retries after the first hook installation attempt.
    #[arg(long, default_value_t = 10, env = "TOKENCLOCK_INSTALL_MAX_RETRIES")]
    pub install_max_retries: u32,

    /// Delay before seeding the clock from an existing authorization.
    #[arg(long, default_value_t = 500, env = "TOKENCLOCK_INITIAL_DELAY_MS")]
    pub initial_delay_ms: u64,

    /// Timeout for token endpoint requests, in seconds.
    #[arg(long, default_value_t = 30, env = "TOKENCLOCK_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Do not render the countdown.
    #[arg(long, env = "TOKENCLOCK_NO_COUNTDOWN")]
    pub no_countdown: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            install_retry_ms: 1000,
            install_max_retries: 10,
            initial_delay_ms: 500,
            request_timeout_secs: 30,
            no_countdown: false,
        }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_ms == 0 {
            anyhow::bail!("--tick-ms must be greater than zero");
        }
        if self.install_retry_ms == 0 {
            anyhow::bail!("--install-retry-ms must be greater than zero");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.install_max_retries,
            interval: Duration::from_millis(self.install_retry_ms),
        }
    }
}

/// Command line for the `tokenclock` binary.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "tokenclock", version, about = "Keep an OAuth2 token refreshed ahead of expiry")]
pub struct Cli {
    /// Path to the authorized credential (JSON).
    #[arg(long, env = "TOKENCLOCK_CREDENTIAL")]
    pub credential: PathBuf,

    /// Log format (json or text).
    #[arg(long, env = "TOKENCLOCK_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TOKENCLOCK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub clock: ClockConfig,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("unknown --log-format: {other} (expected json or text)"),
        }
        self.clock.validate()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
