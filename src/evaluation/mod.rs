pub mod history;
pub mod statistics;
pub mod export;

pub use history::EvaluationHistory;
pub use statistics::{DigitAccuracy, Statistics};
pub use export::{export_history_csv, write_history_csv};
