mod engine;
mod feedback;
mod plan;
mod progress;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use engine::{AdvanceOutcome, SessionEngine, SessionPhase};
pub use feedback::{
    CORRECT_MESSAGES, Feedback, FeedbackGenerator, INCORRECT_MESSAGES, STREAK_MILESTONES,
    streak_milestone,
};
pub use plan::QuestionPool;
pub use progress::SessionProgress;
pub use workflow::{LoopStep, SessionCompletion, SessionLoopService};
