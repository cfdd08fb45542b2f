mod exam;
mod progress;
mod service;
mod workflow;

// Public API of the practice subsystem.
pub use crate::error::PracticeError;
pub use exam::{ExamAnswer, ExamSession};
pub use progress::SessionTally;
pub use service::{AnswerOutcome, PracticeSession};
pub use workflow::{DEFAULT_SESSION_LENGTH, PracticeConfig, PracticeLoopService};
