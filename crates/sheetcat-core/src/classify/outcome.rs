use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a row was not treated as a product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Fewer than two cells with meaningful text.
    Blank,
    /// Name and code are both empty or header words.
    HeaderEcho,
    /// Only one of name/code carries a value; continuation or subtitle line.
    LoneField,
    /// A price next to invalid name and code: subtotal or total line.
    Subtotal,
    /// Every mapped value is a header word.
    SecondaryHeader,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::Blank => "blank",
            RejectReason::HeaderEcho => "header_echo",
            RejectReason::LoneField => "lone_field",
            RejectReason::Subtotal => "subtotal",
            RejectReason::SecondaryHeader => "secondary_header",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "reason")]
pub enum RowVerdict {
    Accept,
    Reject(RejectReason),
}

impl RowVerdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, RowVerdict::Accept)
    }
}
