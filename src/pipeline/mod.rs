//! Suggestion pipeline: a pure state machine and the actor that drives it.
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`PipelineMachine`] | Transitions and effects, no I/O |
//! | [`PipelineCoordinator`] | Serialized application task, worker dispatch |

mod coordinator;
mod machine;

pub use coordinator::{Collaborators, PipelineCoordinator, PipelineSettings};
pub use machine::{Effect, GenerationRequest, PipelineMachine, PipelineState, Token};
