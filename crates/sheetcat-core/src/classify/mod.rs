pub mod engine;
pub mod outcome;

pub use engine::classify_row;
pub use outcome::{RejectReason, RowVerdict};
