use anyhow::{ensure, Result};
use calsync_shared::DEFAULT_NAMESPACE;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::store::RedisStore;

/// Tuning for the processor and sweeper.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Key namespace shared with the producers
    pub namespace: String,
    /// Pause between polls of the intake sets
    pub poll_interval: Duration,
    /// Deadline for a single job
    pub job_timeout: Duration,
    /// Jobs allowed to run at once
    pub max_in_flight: usize,
    /// Pause between in-flight sweeps
    pub sweep_interval: Duration,
    /// Age after which an in-flight marker is treated as abandoned
    pub stale_after: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            poll_interval: Duration::from_secs(1),
            job_timeout: Duration::from_secs(120), // 2 minutes
            max_in_flight: 64,
            sweep_interval: Duration::from_secs(60),
            stale_after: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.namespace.is_empty(), "namespace must not be empty");
        ensure!(
            !self.poll_interval.is_zero(),
            "poll interval must be greater than zero"
        );
        ensure!(
            !self.sweep_interval.is_zero(),
            "sweep interval must be greater than zero"
        );
        ensure!(self.max_in_flight > 0, "max in flight must be at least 1");
        ensure!(
            self.stale_after > self.job_timeout,
            "stale threshold ({:?}) must exceed the job timeout ({:?})",
            self.stale_after,
            self.job_timeout
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(name = "calsync")]
#[command(version)]
#[command(about = "Synchronizes queued calendar records with Google Calendar")]
pub struct Cli {
    /// Google service account key file
    #[arg(short = 'k', long, default_value = "key.json", env = "GOOGLE_KEY_FILE")]
    pub key_file: PathBuf,

    /// Redis address (host:port)
    #[arg(short = 'a', long, default_value = "redis:6379", env = "REDIS_ADDR")]
    pub redis_addr: String,

    /// Redis password
    #[arg(short = 'p', long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    /// Redis database index
    #[arg(short = 'd', long, default_value_t = 0, env = "REDIS_DB")]
    pub redis_db: i64,

    /// Key namespace shared with producers
    #[arg(long, default_value = DEFAULT_NAMESPACE, env = "CALSYNC_NAMESPACE")]
    pub namespace: String,

    /// Milliseconds between polls of the queues
    #[arg(long, default_value_t = 1000, env = "CALSYNC_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Seconds a single job may run before it is marked failed
    #[arg(long, default_value_t = 120, env = "CALSYNC_JOB_TIMEOUT_SECS")]
    pub job_timeout_secs: u64,

    /// Maximum number of jobs running at once
    #[arg(long, default_value_t = 64, env = "CALSYNC_MAX_IN_FLIGHT")]
    pub max_in_flight: usize,

    /// Seconds between sweeps for abandoned in-flight keys
    #[arg(long, default_value_t = 60, env = "CALSYNC_SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: u64,

    /// Seconds after which an in-flight key is considered abandoned
    #[arg(long, default_value_t = 600, env = "CALSYNC_STALE_AFTER_SECS")]
    pub stale_after_secs: u64,
}

impl Cli {
    pub fn processor_config(&self) -> Result<ProcessorConfig> {
        let config = ProcessorConfig {
            namespace: self.namespace.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            job_timeout: Duration::from_secs(self.job_timeout_secs),
            max_in_flight: self.max_in_flight,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            stale_after: Duration::from_secs(self.stale_after_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn redis_url(&self) -> String {
        RedisStore::url(
            &self.redis_addr,
            self.redis_password.as_deref(),
            self.redis_db,
        )
    }
}
