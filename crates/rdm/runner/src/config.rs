//! Runner configuration
//!
//! Values are layered: built-in defaults, then an optional file, then
//! `RDM_`-prefixed environment variables (e.g. `RDM_INTER_TEST_DELAY_MS`).

use crate::{RunnerError, RunnerResult};
use rdm_types::Uid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Tests that reset the responder to factory defaults
pub const FACTORY_DEFAULTS_TESTS: [&str; 2] = ["ResetFactoryDefaults", "ResetFactoryDefaultsWithData"];

/// Default cap on back-to-back GET QUEUED_MESSAGE requests per drain
pub const DEFAULT_QUEUED_MESSAGE_LIMIT: u32 = 25;

/// Default cap on ACK_TIMER responses accepted per drain
pub const DEFAULT_ACK_TIMER_LIMIT: u32 = 25;

/// Static configuration of a test runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Universe the responder is patched on
    #[serde(default)]
    pub universe: u32,

    /// Responder under test
    #[serde(default)]
    pub uid: Uid,

    /// Pause after a broadcast SET before checking its effect (ms)
    #[serde(default = "default_broadcast_write_delay")]
    pub broadcast_write_delay_ms: u64,

    /// Pause between consecutive tests (ms)
    #[serde(default)]
    pub inter_test_delay_ms: u64,

    /// Prefix result lines with a timestamp
    #[serde(default)]
    pub timestamp: bool,

    /// Loop limit for queued-message draining
    #[serde(default = "default_queued_message_limit")]
    pub queued_message_limit: u32,

    /// ACK_TIMER responses a single drain accepts before giving up
    #[serde(default = "default_ack_timer_limit")]
    pub ack_timer_limit: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            universe: 0,
            uid: Uid::default(),
            broadcast_write_delay_ms: default_broadcast_write_delay(),
            inter_test_delay_ms: 0,
            timestamp: false,
            queued_message_limit: DEFAULT_QUEUED_MESSAGE_LIMIT,
            ack_timer_limit: DEFAULT_ACK_TIMER_LIMIT,
        }
    }
}

fn default_broadcast_write_delay() -> u64 {
    50
}

fn default_queued_message_limit() -> u32 {
    DEFAULT_QUEUED_MESSAGE_LIMIT
}

fn default_ack_timer_limit() -> u32 {
    DEFAULT_ACK_TIMER_LIMIT
}

impl RunnerConfig {
    /// Create a configuration for one responder
    pub fn new(universe: u32, uid: Uid) -> Self {
        Self {
            universe,
            uid,
            ..Default::default()
        }
    }

    pub fn with_inter_test_delay(mut self, delay_ms: u64) -> Self {
        self.inter_test_delay_ms = delay_ms;
        self
    }

    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_queued_message_limit(mut self, limit: u32) -> Self {
        self.queued_message_limit = limit;
        self
    }

    pub fn with_ack_timer_limit(mut self, limit: u32) -> Self {
        self.ack_timer_limit = limit;
        self
    }

    pub fn inter_test_delay(&self) -> Duration {
        Duration::from_millis(self.inter_test_delay_ms)
    }

    pub fn broadcast_write_delay(&self) -> Duration {
        Duration::from_millis(self.broadcast_write_delay_ms)
    }

    /// Load configuration from file and environment
    pub fn load(path: Option<&str>) -> RunnerResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&RunnerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("RDM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: RunnerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stop every drain before it starts
    pub fn validate(&self) -> RunnerResult<()> {
        if self.queued_message_limit == 0 {
            return Err(RunnerError::Config(
                "queued_message_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-run selection of tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Restrict the run to these test names (plus their dependencies)
    pub whitelist: Option<BTreeSet<String>>,

    /// Leave out the tests in [`FACTORY_DEFAULTS_TESTS`]
    pub skip_factory_defaults: bool,
}

impl RunOptions {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            whitelist: Some(names.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn without_factory_defaults(mut self) -> Self {
        self.skip_factory_defaults = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.queued_message_limit, 25);
        assert_eq!(config.inter_test_delay(), Duration::ZERO);
        assert!(!config.timestamp);
    }

    #[test]
    fn test_builder_helpers() {
        let config = RunnerConfig::new(3, Uid::new(0x7a70, 2))
            .with_inter_test_delay(20)
            .with_timestamp(true)
            .with_queued_message_limit(5);
        assert_eq!(config.universe, 3);
        assert_eq!(config.inter_test_delay(), Duration::from_millis(20));
        assert!(config.timestamp);
        assert_eq!(config.queued_message_limit, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "universe = 7").unwrap();
        writeln!(file, "uid = \"7a70:00000010\"").unwrap();
        writeln!(file, "inter_test_delay_ms = 100").unwrap();
        file.flush().unwrap();

        let config = RunnerConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.universe, 7);
        assert_eq!(config.uid, Uid::new(0x7a70, 0x10));
        assert_eq!(config.inter_test_delay_ms, 100);
        assert_eq!(config.queued_message_limit, 25);
    }

    #[test]
    fn test_load_rejects_zero_loop_limit() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "queued_message_limit = 0").unwrap();
        file.flush().unwrap();

        let err = RunnerConfig::load(file.path().to_str()).unwrap_err();
        assert!(matches!(err, RunnerError::Config(_)));
    }

    #[test]
    fn test_ack_timer_limit_default_and_override() {
        assert_eq!(RunnerConfig::default().ack_timer_limit, 25);
        let config = RunnerConfig::default().with_ack_timer_limit(3);
        assert_eq!(config.ack_timer_limit, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_options() {
        let options = RunOptions::only(["DeviceInfo"]).without_factory_defaults();
        assert!(options.skip_factory_defaults);
        assert!(options.whitelist.unwrap().contains("DeviceInfo"));
        assert!(RunOptions::all().whitelist.is_none());
    }
}
