pub mod feedback;
pub mod log;

pub use feedback::FeedbackResult;
pub use log::{Condition, TrainingLog};
