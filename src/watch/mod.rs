//! Continuous watching: filesystem events in, organized files out.

mod engine;
mod registry;
mod stability;

pub use engine::{EngineConfig, WatchEngine, WatchStatus};
pub use registry::{WatchRegistry, WatchSubscription};
pub use stability::{StabilityGate, Sweep};
