//! State module for tracking polling progress
//!
//! # Components
//!
//! - `Target`: One tracked board or thread endpoint and its conditional-fetch token
//! - `TargetRegistry`: Ordered map of targets, mutated between fetch snapshots
//! - `SeenCache`: Post identifiers already handed to the sink this run
//! - `PollState`: Phase of the poll loop

mod poll_state;
mod registry;
mod seen;
mod target;

// Re-export main types
pub use poll_state::PollState;
pub use registry::{Reconciled, TargetRegistry};
pub use seen::SeenCache;
pub use target::{ConditionalToken, Target};
