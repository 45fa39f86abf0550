//! Interactive edit session over a settlement result.
//!
//! Edits are infallible: numeric input goes through
//! [`parse_decimal`](crate::ingest::parse_decimal) (garbage becomes zero)
//! and out-of-range indices are ignored. Every applied operation is
//! followed by [`recompute_in_place`], so derived fields are never stale.

use tracing::debug;

use crate::ingest::parse_decimal;
use crate::model::{LineItem, MonthlyBreakdown, Nature, SettlementResult};
use crate::recompute::recompute_in_place;

/// Free-text fields of the settlement header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Claimant,
    Respondent,
    CaseNumber,
    FilingDate,
    LiquidationDate,
    PeriodStart,
    PeriodEnd,
    Observation,
}

/// User-set numeric inputs of the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountField {
    WithholdingTax,
    IncomeTax,
    SeveranceFund,
    FeePercent,
    EmployerPercent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    Nature,
    Nominal,
    Corrected,
    Interest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthField {
    Competence,
    Base,
    Quantity,
    Unit,
    Index,
    Nominal,
    Corrected,
    Interest,
}

/// A single user edit. Values are raw user input.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    SetHeader(HeaderField, String),
    SetAmount(AmountField, String),
    AddItem,
    RemoveItem(usize),
    SetItem(usize, ItemField, String),
    AddMonth(usize),
    RemoveMonth(usize, usize),
    SetMonth(usize, usize, MonthField, String),
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn optional_text(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

/// An in-progress edit, holding the pre-edit snapshot for cancellation.
#[derive(Debug, Clone)]
pub struct EditSession {
    original: SettlementResult,
    /// `original` after the opening recompute.
    baseline: SettlementResult,
    current: SettlementResult,
}

impl EditSession {
    /// Start editing. The working copy is brought to a consistent state
    /// immediately.
    pub fn begin(result: SettlementResult) -> Self {
        let mut baseline = result.clone();
        recompute_in_place(&mut baseline);
        Self {
            original: result,
            current: baseline.clone(),
            baseline,
        }
    }

    pub fn current(&self) -> &SettlementResult {
        &self.current
    }

    /// The working copy differs from the stored result, including totals
    /// changed only by the opening recompute.
    pub fn is_dirty(&self) -> bool {
        self.current != self.original
    }

    /// Applied operations changed the result beyond the opening recompute.
    pub fn has_edits(&self) -> bool {
        self.current != self.baseline
    }

    /// The stored derived totals were stale when editing began.
    pub fn was_stale(&self) -> bool {
        self.baseline != self.original
    }

    /// Apply one edit. Returns whether the working copy changed.
    pub fn apply(&mut self, op: EditOp) -> bool {
        let before = self.current.clone();
        debug!(?op, "applying edit");
        self.apply_raw(op);
        recompute_in_place(&mut self.current);
        self.current != before
    }

    pub fn apply_all(&mut self, ops: impl IntoIterator<Item = EditOp>) -> usize {
        ops.into_iter().filter(|op| self.apply(op.clone())).count()
    }

    /// Discard edits and return the pre-edit snapshot.
    pub fn cancel(self) -> SettlementResult {
        self.original
    }

    /// Finish editing and return the edited result.
    pub fn commit(self) -> SettlementResult {
        self.current
    }

    fn apply_raw(&mut self, op: EditOp) {
        let r = &mut self.current;
        match op {
            EditOp::SetHeader(field, value) => match field {
                HeaderField::Claimant => r.claimant = value,
                HeaderField::Respondent => r.respondent = value,
                HeaderField::CaseNumber => r.case_number = value,
                HeaderField::FilingDate => r.filing_date = optional_text(value),
                HeaderField::LiquidationDate => r.liquidation_date = optional_text(value),
                HeaderField::PeriodStart => r.period_start = optional_text(value),
                HeaderField::PeriodEnd => r.period_end = optional_text(value),
                HeaderField::Observation => r.observation = optional_text(value),
            },
            EditOp::SetAmount(field, value) => {
                let v = parse_decimal(&value);
                match field {
                    AmountField::WithholdingTax => r.withholding_tax = v,
                    AmountField::IncomeTax => r.income_tax = v,
                    AmountField::SeveranceFund => r.severance_fund = Some(v),
                    AmountField::FeePercent => r.fee_percent = v,
                    AmountField::EmployerPercent => r.employer_percent = v,
                }
            }
            EditOp::AddItem => r.items.push(LineItem::new("Nova Rubrica", Nature::Wage)),
            EditOp::RemoveItem(idx) => {
                if idx < r.items.len() {
                    r.items.remove(idx);
                }
            }
            EditOp::SetItem(idx, field, value) => {
                let Some(item) = r.items.get_mut(idx) else { return };
                match field {
                    ItemField::Description => item.description = value,
                    ItemField::Nature => item.nature = Nature::from_tag(&value),
                    ItemField::Nominal => item.nominal = parse_decimal(&value),
                    ItemField::Corrected => item.corrected = parse_decimal(&value),
                    ItemField::Interest => item.interest = parse_decimal(&value),
                }
            }
            EditOp::AddMonth(idx) => {
                if let Some(item) = r.items.get_mut(idx) {
                    item.months.push(MonthlyBreakdown::blank());
                }
            }
            EditOp::RemoveMonth(idx, row) => {
                if let Some(item) = r.items.get_mut(idx) {
                    if row < item.months.len() {
                        item.months.remove(row);
                    }
                }
            }
            EditOp::SetMonth(idx, row, field, value) => {
                let Some(m) = r.items.get_mut(idx).and_then(|i| i.months.get_mut(row)) else {
                    return;
                };
                match field {
                    MonthField::Competence => m.competence = value,
                    MonthField::Unit => m.unit = Some(value),
                    MonthField::Base => m.base = parse_decimal(&value),
                    MonthField::Quantity => m.quantity = Some(parse_decimal(&value)),
                    MonthField::Corrected => m.corrected = parse_decimal(&value),
                    MonthField::Interest => m.interest = parse_decimal(&value),
                    MonthField::Nominal => {
                        m.nominal = parse_decimal(&value);
                        m.corrected = round2(m.nominal * m.effective_index());
                    }
                    MonthField::Index => {
                        m.index = Some(parse_decimal(&value));
                        m.corrected = round2(m.nominal * m.effective_index());
                    }
                }
            }
        }
    }
}
