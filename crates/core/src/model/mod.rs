mod ids;
mod progress;
mod question;
mod summary;

pub use ids::{GENERAL_SKILL, LearnerId, ParseIdError, QuestionId, Skill};
pub use progress::{
    AnswerEffect, Badge, POINTS_BADGE_THRESHOLD, ProgressError, ProgressRecord,
    STREAK_BADGE_THRESHOLD, SkillStat,
};
pub use question::{Difficulty, InvalidQuestionError, Question, QuestionDraft};
pub use summary::{AccuracyBand, ProgressSummary, SkillSummary};
