#![forbid(unsafe_code)]

pub mod app_services;
pub mod banks;
pub mod error;
pub mod practice;
pub mod progress_store;

pub use prep_core::Clock;

pub use app_services::AppServices;
pub use banks::{LocalJsonBank, OpenSatBank, QuestionBank, QuestionFilter, Subject};
pub use error::{AppServicesError, PracticeError, ProgressStoreError, QuestionBankError};
pub use practice::{
    AnswerOutcome, ExamSession, PracticeConfig, PracticeLoopService, PracticeSession, SessionTally,
};
pub use progress_store::{AnswerReceipt, ProgressStore};
