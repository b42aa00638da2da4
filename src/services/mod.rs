pub mod generation;
pub mod grading;
pub mod ingestion;
pub mod paper_service;
pub mod rating;
pub mod wrong_book;

pub use generation::{LlmGenerator, QuestionGenerator};
pub use grading::{GradeResult, GradingService};
pub use ingestion::{IngestionReport, IngestionService};
pub use paper_service::PaperService;
pub use rating::RatingService;
pub use wrong_book::WrongBookService;
