use std::time::Duration;

/// Client configuration.
///
/// # Example
///
/// ```
/// use duorpc_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(5))
///     .with_read_buffer(16 * 1024);
/// ```
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Per-call timeout, applied uniformly to every call. `None` (the
    /// default) means calls wait for a response indefinitely.
    pub timeout: Option<Duration>,
    /// How many bytes each read reserves in the framer.
    pub read_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            read_buffer: 4096,
        }
    }
}

impl ClientConfig {
    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the per-read buffer reservation.
    pub fn with_read_buffer(mut self, read_buffer: usize) -> Self {
        self.read_buffer = read_buffer;
        self
    }
}
