//! Report rendering: PDF settlement statements, XLSX workbooks, and the
//! pt-BR number formatting and file naming they share.

mod error;
pub mod format;
pub mod naming;
pub mod pdf;
pub mod xlsx;

pub use error::ExportError;
pub use format::{format_brl, format_number};
