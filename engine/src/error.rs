//! Error types returned by the broker.
//!
//! Every fallible broker operation returns [`Result`]. Errors fall into three groups:
//!
//! - **Usage** errors: operating on a torn-down broker, re-initializing a live one, invalid
//!   delays or time steps, unknown subscriber ids.
//! - **Lifetime** errors: a subscriber was dropped while still subscribed. The broker always
//!   prunes such subscribers; it only reports them as errors in strict mode
//!   (see [`Config::strict_lifetimes`](crate::Config::strict_lifetimes)).
//! - **Runtime** errors: feedback loops that exceed the configured flush or send depth limits.

use thiserror::Error;

use crate::broker::SubscriberId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the event broker.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The broker has been torn down and must be re-initialized before use.
    #[error("cannot {operation}: broker has been torn down")]
    TornDown {
        /// The rejected operation.
        operation: &'static str,
    },

    /// `initialize` was called on a broker that is already initialized.
    #[error("broker is already initialized")]
    AlreadyInitialized,

    /// A delay was negative, NaN or infinite.
    #[error("invalid delay {delay}s: delays must be finite and not negative")]
    InvalidDelay {
        /// The rejected delay in seconds.
        delay: f32,
    },

    /// A time step was negative, NaN or infinite.
    #[error("invalid time step {dt}s: time steps must be finite and not negative")]
    InvalidTimeStep {
        /// The rejected time step in seconds.
        dt: f32,
    },

    /// The subscriber id is not registered with this broker.
    #[error("subscriber {id} is not registered")]
    UnknownSubscriber {
        /// The unknown id.
        id: SubscriberId,
    },

    /// A subscriber was dropped without unsubscribing. It has been pruned.
    #[error("subscriber {id} ({name}) was dropped while still subscribed")]
    SubscriberDropped {
        /// The pruned id.
        id: SubscriberId,
        /// Name the subscriber reported when it was registered.
        name: String,
    },

    /// A single flush drained more events than allowed.
    #[error("flush limit of {limit} events exceeded; {remaining} events left queued")]
    FlushLimitExceeded {
        /// The configured limit.
        limit: usize,
        /// Events still queued when the flush stopped.
        remaining: usize,
    },

    /// Subscribers kept sending from inside `receive` past the configured depth.
    #[error("nested send depth of {limit} exceeded")]
    SendDepthExceeded {
        /// The configured limit.
        limit: usize,
    },
}

impl Error {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::TornDown { .. } => "broker_torn_down",
            Error::AlreadyInitialized => "broker_already_initialized",
            Error::InvalidDelay { .. } => "invalid_delay",
            Error::InvalidTimeStep { .. } => "invalid_time_step",
            Error::UnknownSubscriber { .. } => "unknown_subscriber",
            Error::SubscriberDropped { .. } => "subscriber_dropped",
            Error::FlushLimitExceeded { .. } => "flush_limit_exceeded",
            Error::SendDepthExceeded { .. } => "send_depth_exceeded",
        }
    }

    /// Returns `true` for errors caused by calling the broker incorrectly.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::TornDown { .. }
                | Error::AlreadyInitialized
                | Error::InvalidDelay { .. }
                | Error::InvalidTimeStep { .. }
                | Error::UnknownSubscriber { .. }
        )
    }
}
