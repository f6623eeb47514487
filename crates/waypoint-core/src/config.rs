//! Router configuration

use std::time::Duration;
use waypoint_router::RegistrationPolicy;

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Retries allowed for destination-creation/transition failures (default: 3)
    pub max_retry_count: u32,
    /// Fixed delay between retries (default: 300ms)
    pub retry_delay: Duration,
    /// Max entries in the path resolution cache (default: 256)
    pub cache_capacity: usize,
    /// Duplicate-pattern handling (default: Replace)
    pub registration: RegistrationPolicy,
    /// Whether transitions are requested animated (default: true)
    pub animated: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_retry_count: 3,
            retry_delay: Duration::from_millis(300),
            cache_capacity: 256,
            registration: RegistrationPolicy::Replace,
            animated: true,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retry_count(mut self, count: u32) -> Self {
        self.max_retry_count = count;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay = Duration::from_millis(ms);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn registration(mut self, policy: RegistrationPolicy) -> Self {
        self.registration = policy;
        self
    }

    pub fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }
}
