//! Shared infrastructure for ORTC transports
//!
//! - [`queue`]: the serialized [`AwaitQueue`] every transport runs its
//!   handler operations through, and the [`PendingTaskBatcher`] that
//!   coalesces consumer operations in front of it
//! - [`logging`]: `tracing-subscriber` setup
//! - [`config`]: file and environment configuration

pub mod config;
pub mod logging;
pub mod queue;

pub use config::{ConfigError, CoreConfig};
pub use logging::{setup_logging, try_setup_logging, LoggingConfig};
pub use queue::{AwaitQueue, PendingTaskBatcher, QueueError, QueueOptions, TaskSnapshot};

/// Re-export of common types
pub mod prelude {
    pub use super::{
        AwaitQueue, CoreConfig, LoggingConfig, PendingTaskBatcher, QueueError, QueueOptions,
        TaskSnapshot,
    };
}
