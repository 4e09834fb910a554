//! Service configuration.

/// Default capacity of the daemon's request channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Configuration for a service daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Request channel capacity. A full channel surfaces to clients as
    /// backpressure rather than blocking them.
    pub channel_capacity: usize,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}
