pub mod collaborators;
pub mod processing_record;
pub mod question_flow;

pub use collaborators::{AnswerDisplay, ConsoleDisplay, QuestionSource, TomlQuestionSource};
pub use processing_record::{ProcessingRecords, ProcessingState};
pub use question_flow::{ProcessResult, ProcessorStats, QuestionProcessor, ScanSummary};
