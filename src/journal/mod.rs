//! Journal service: recording, editing, listing and summarizing trades.

mod query;
mod service;

pub use query::{SortOrder, TradeQuery};
pub use service::{JournalError, JournalResult, TradeJournal};
