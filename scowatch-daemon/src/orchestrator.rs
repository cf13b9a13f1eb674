//! Monitor lifecycle -- configuration, assembly, run and shutdown.
//!
//! The [`Orchestrator`] owns the loaded configuration and the built
//! [`LogMonitor`]. It runs the monitor until a shutdown signal arrives, then
//! cancels it so the open transaction is closed as aborted and flushed
//! before the process exits.
//!
//! # Configuration order
//!
//! 1. `scowatch.toml` (or built-in defaults when no file is given)
//! 2. `SCOWATCH_*` environment overrides
//! 3. CLI overrides
//! 4. Validation

use std::future::Future;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use scowatch_core::config::ScowatchConfig;
use scowatch_core::error::ScowatchError;
use scowatch_log_pipeline::{LogMonitor, LogMonitorBuilder, MonitorStats, PipelineConfig, RuleLoader};

use crate::cli::DaemonCli;

/// Loads the configuration in precedence order and validates it.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// resulting configuration is invalid.
pub async fn load_config(cli: &DaemonCli) -> Result<ScowatchConfig> {
    let mut config = match &cli.config {
        Some(path) => ScowatchConfig::from_file(path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ScowatchConfig::default(),
    };

    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config.validate().context("config validation failed")?;

    Ok(config)
}

/// Checks the monitor settings and the rule configuration without opening
/// any file for writing.
///
/// Returns the number of rule definitions loaded.
pub async fn validate_config(config: &ScowatchConfig) -> Result<usize> {
    let pipeline_config = PipelineConfig::from_core(config);
    pipeline_config
        .validate()
        .map_err(ScowatchError::from)
        .context("invalid monitor settings")?;

    let rules = RuleLoader::load_or_builtin(pipeline_config.rules_path.as_deref())
        .await
        .map_err(ScowatchError::from)
        .context("invalid rule configuration")?;

    Ok(rules.len())
}

/// The daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: ScowatchConfig,
    /// The monitor, ready to run.
    monitor: LogMonitor,
}

impl Orchestrator {
    /// Builds the monitor from an already-loaded configuration.
    ///
    /// Rules are loaded and output files opened here, so every startup
    /// failure surfaces before tailing begins.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the rule
    /// configuration cannot be loaded, or an output cannot be opened.
    pub async fn build_from_config(config: ScowatchConfig) -> Result<Self> {
        config.validate().context("config validation failed")?;

        let pipeline_config = PipelineConfig::from_core(&config);
        let monitor = LogMonitorBuilder::new()
            .config(pipeline_config)
            .build()
            .await
            .map_err(ScowatchError::from)
            .context("failed to build log monitor")?;

        tracing::info!(
            log_path = %monitor.config().log_path.display(),
            aggregate = monitor.config().aggregate_transactions,
            "orchestrator initialized"
        );

        Ok(Self { config, monitor })
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &ScowatchConfig {
        &self.config
    }

    /// Runs the monitor until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<MonitorStats> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Runs the monitor until `shutdown` resolves.
    ///
    /// `shutdown` yields the name of the signal that triggered it. The
    /// monitor is cancelled, not dropped, so its shutdown path still runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor fails (the log file cannot be opened
    /// or read) or the shutdown signal handler cannot be installed.
    pub async fn run_until<F>(self, shutdown: F) -> Result<MonitorStats>
    where
        F: Future<Output = Result<&'static str>>,
    {
        let cancel = CancellationToken::new();
        let monitor = self.monitor.run(cancel.child_token());
        tokio::pin!(monitor);

        tracing::info!("entering main loop");
        let signal = tokio::select! {
            result = &mut monitor => {
                return result.map_err(ScowatchError::from).context("log monitor failed");
            }
            signal = shutdown => signal,
        };

        match &signal {
            Ok(name) => tracing::info!(signal = name, "shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "shutdown signal handler failed"),
        }
        cancel.cancel();

        let stats = monitor
            .await
            .map_err(ScowatchError::from)
            .context("log monitor failed")?;
        signal?;
        Ok(stats)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {}", e))?;
    Ok("CTRL_C")
}
