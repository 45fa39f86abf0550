//! Derived-totals recomputation for edited settlements.
//!
//! Once a result is being edited, a handful of fields stop being model
//! output and become functions of the rest:
//!
//! - a line item with breakdown rows takes its nominal, corrected, interest
//!   and total from the rows (each row total = corrected + interest);
//! - a line item without rows keeps its corrected/interest and derives the
//!   total from them;
//! - the top-level aggregates come from the items plus the fee and employer
//!   percentages.
//!
//! [`recompute`] returns `None` when the input is already consistent, so a
//! caller reacting to every change never loops on its own update.

use crate::model::{LineItem, Nature, SettlementResult};

/// Aggregates derived from a settlement's line items and percentages.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub corrected_total: f64,
    pub interest_total: f64,
    pub gross_total: f64,
    pub employer_charge_base: f64,
    pub employer_charge: f64,
    pub fee_amount: f64,
    pub net_total: f64,
    pub grand_total: f64,
}

impl Totals {
    /// Compute aggregates from already-consistent line items.
    pub fn compute(result: &SettlementResult) -> Self {
        let corrected_total: f64 = result.items.iter().map(|i| i.corrected).sum();
        let interest_total: f64 = result.items.iter().map(|i| i.interest).sum();
        let gross_total = corrected_total + interest_total;

        let employer_charge_base: f64 = result
            .items
            .iter()
            .filter(|i| i.nature == Nature::Wage)
            .map(|i| i.corrected)
            .sum();
        let employer_charge = employer_charge_base * result.employer_percent / 100.0;
        let fee_amount = gross_total * result.fee_percent / 100.0;
        let net_total = gross_total - result.withholding_tax - result.income_tax
            + result.severance_credit();
        let grand_total = gross_total + fee_amount + employer_charge;

        Self {
            corrected_total,
            interest_total,
            gross_total,
            employer_charge_base,
            employer_charge,
            fee_amount,
            net_total,
            grand_total,
        }
    }

    fn apply(&self, result: &mut SettlementResult) {
        result.corrected_total = self.corrected_total;
        result.interest_total = self.interest_total;
        result.gross_total = self.gross_total;
        result.employer_charge_base = self.employer_charge_base;
        result.employer_charge = self.employer_charge;
        result.fee_amount = self.fee_amount;
        result.net_total = self.net_total;
        result.grand_total = self.grand_total;
    }
}

/// Bring one line item in line with its breakdown rows.
pub fn derive_item(item: &mut LineItem) {
    if item.months.is_empty() {
        item.total = item.corrected + item.interest;
        return;
    }

    for row in &mut item.months {
        row.total = row.corrected + row.interest;
    }
    item.nominal = item.months.iter().map(|m| m.nominal).sum();
    item.corrected = item.months.iter().map(|m| m.corrected).sum();
    item.interest = item.months.iter().map(|m| m.interest).sum();
    item.total = item.months.iter().map(|m| m.total).sum();
}

/// Recompute every derived field.
///
/// Returns the updated result, or `None` when nothing would change.
pub fn recompute(result: &SettlementResult) -> Option<SettlementResult> {
    let mut next = result.clone();
    for item in &mut next.items {
        derive_item(item);
    }
    Totals::compute(&next).apply(&mut next);

    (next != *result).then_some(next)
}

/// In-place variant of [`recompute`]. Returns whether anything changed.
pub fn recompute_in_place(result: &mut SettlementResult) -> bool {
    match recompute(result) {
        Some(next) => {
            *result = next;
            true
        }
        None => false,
    }
}
