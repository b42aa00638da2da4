pub mod paper;
pub mod question;
pub mod wrong_record;

pub use paper::Paper;
pub use question::{NewQuestion, Question, QuestionType};
pub use wrong_record::WrongRecord;
