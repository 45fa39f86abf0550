pub mod edit;
pub mod ingest;
pub mod limits;
pub mod model;
pub mod recompute;
pub mod upload;

pub use edit::{AmountField, EditOp, EditSession, HeaderField, ItemField, MonthField};
pub use limits::Limits;
pub use model::{
    CalculationSource, HistoryEntry, InterestDetail, LineItem, MonthlyBreakdown, Nature,
    SettlementResult,
};
pub use recompute::{Totals, recompute, recompute_in_place};
pub use upload::{CandidateFile, Rejection, Selection, UploadQueue};
