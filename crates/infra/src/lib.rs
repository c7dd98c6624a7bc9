//! Infrastructure layer: queue backends, rate limiting, record stores,
//! alert delivery.
//!
//! Every capability here is a trait with at least an in-process reference
//! implementation; Redis-backed variants live behind the `redis` cargo
//! feature and are selected at deployment time, not branched on at call
//! sites.

pub mod alerts;
pub mod queue;
pub mod rate_limit;
pub mod store;

pub use alerts::AlertClient;
pub use queue::{InMemoryQueue, JobQueue, QueueError, QueueMetrics};
pub use rate_limit::{RateLimitError, RateLimiter, SlidingWindowLimiter};
pub use store::{
    Credential, CredentialStore, InMemoryCredentialStore, InMemoryRevocationStore,
    InMemoryRoleStore, RevocationStore, RoleStore, StoreError,
};
