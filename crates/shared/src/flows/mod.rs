pub mod history;
pub mod retrieval;
pub mod submission;

pub use history::HistoryFlow;
pub use retrieval::{EvictionPolicy, ResultView, RetrievalFlow};
pub use submission::{MissingField, Route, SubmissionError, SubmissionFlow, SubmissionOutcome};
