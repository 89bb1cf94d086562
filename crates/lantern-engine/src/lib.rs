//! Async traversal runtime: retrying store gateway, dual-cursor pool
//! manager, and the timer-driven traversal coordinator that owns all
//! mutable engine state.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod gateway;
pub mod pool;

pub use coordinator::{EngineStats, Lifecycle, TraversalEngine};
pub use error::EngineError;
pub use events::{EngineEvent, EventBus};
pub use gateway::{RetryPolicy, StoreGateway};
pub use pool::{PoolManager, PoolStats, Replenishment};
