/// Default pre-allocated capacity of the pending queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default cap on events drained by a single flush.
pub const DEFAULT_FLUSH_LIMIT: usize = 1 << 16;

/// Default cap on sends issued from inside `receive` that nest within one another.
pub const DEFAULT_MAX_SEND_DEPTH: usize = 64;

/// Broker configuration.
///
/// ```rust,ignore
/// let config = Config::default()
///     .with_queue_capacity(256)
///     .with_flush_limit(Some(10_000))
///     .with_strict_lifetimes(true);
/// let broker = Broker::<GameEvent>::with_config(config);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Capacity pre-allocated for the pending queue and the delayed list.
    pub queue_capacity: usize,
    /// Maximum number of events drained by one `flush_queue` call. `None` disables the cap and
    /// leaves feedback loops to the caller.
    pub flush_limit: Option<usize>,
    /// Maximum nesting of sends made through a dispatch context. The outer send is level zero,
    /// so this many context sends may nest below it; nesting beyond that fails with
    /// [`Error::SendDepthExceeded`](crate::Error::SendDepthExceeded).
    pub max_send_depth: usize,
    /// Report dropped subscribers as errors instead of only logging them.
    pub strict_lifetimes: bool,
}

impl Config {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_flush_limit(mut self, limit: Option<usize>) -> Self {
        self.flush_limit = limit;
        self
    }

    pub fn with_max_send_depth(mut self, depth: usize) -> Self {
        self.max_send_depth = depth;
        self
    }

    pub fn with_strict_lifetimes(mut self, strict: bool) -> Self {
        self.strict_lifetimes = strict;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flush_limit: Some(DEFAULT_FLUSH_LIMIT),
            max_send_depth: DEFAULT_MAX_SEND_DEPTH,
            strict_lifetimes: false,
        }
    }
}
