//! Storage layer: the persisted, most-recent-first settlement history.

mod error;
pub use error::StoreError;

mod history;
pub use history::{DEFAULT_SLOT, HistoryStore};
