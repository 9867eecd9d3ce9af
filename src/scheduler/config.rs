use std::str::FromStr;
use std::time::Duration;

/// Tuning knobs for a [`Scheduler`](super::Scheduler).
///
/// Every field has a sensible default; construct with [`Default`] and adjust
/// via the `with_*` setters, or pull overrides from `STRATOFLOW_*`
/// environment variables with [`SchedulerConfig::from_env`].
///
/// `max_retries` counts retries after the initial attempt: the default of 3
/// allows up to 4 invocations of a failing step. The delay before retry *k*
/// is `base_retry_delay * k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub step_timeout: Duration,
    pub parallelism: usize,
    pub pause_poll_interval: Duration,
    pub event_capacity: usize,
}

impl SchedulerConfig {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_BASE_RETRY_DELAY: Duration = Duration::from_millis(250);
    pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);
    pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by any `STRATOFLOW_*` variables present in the
    /// environment or a `.env` file. Unparsable values are ignored with a
    /// warning.
    ///
    /// Recognized variables: `STRATOFLOW_MAX_RETRIES`,
    /// `STRATOFLOW_RETRY_DELAY_MS`, `STRATOFLOW_STEP_TIMEOUT_MS`,
    /// `STRATOFLOW_PARALLELISM`, `STRATOFLOW_PAUSE_POLL_MS`,
    /// `STRATOFLOW_EVENT_CAPACITY`.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Some(value) = env_parse("STRATOFLOW_MAX_RETRIES") {
            config.max_retries = value;
        }
        if let Some(value) = env_parse("STRATOFLOW_RETRY_DELAY_MS") {
            config.base_retry_delay = Duration::from_millis(value);
        }
        if let Some(value) = env_parse("STRATOFLOW_STEP_TIMEOUT_MS") {
            config.step_timeout = Duration::from_millis(value);
        }
        if let Some(value) = env_parse::<usize>("STRATOFLOW_PARALLELISM") {
            config.parallelism = value.max(1);
        }
        if let Some(value) = env_parse("STRATOFLOW_PAUSE_POLL_MS") {
            config.pause_poll_interval = Duration::from_millis(value);
        }
        if let Some(value) = env_parse::<usize>("STRATOFLOW_EVENT_CAPACITY") {
            config.event_capacity = value.max(1);
        }
        config
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_base_retry_delay(mut self, delay: Duration) -> Self {
        self.base_retry_delay = delay;
        self
    }

    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Intra-level concurrency bound; clamped to at least 1.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    #[must_use]
    pub fn with_pause_poll_interval(mut self, interval: Duration) -> Self {
        self.pause_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            base_retry_delay: Self::DEFAULT_BASE_RETRY_DELAY,
            step_timeout: Self::DEFAULT_STEP_TIMEOUT,
            parallelism,
            pause_poll_interval: Self::DEFAULT_PAUSE_POLL_INTERVAL,
            event_capacity: Self::DEFAULT_EVENT_CAPACITY,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable scheduler setting");
            None
        }
    }
}
