//! Command-line edit syntax: `PATH=VALUE` assignments and `N.M` row refs.

use anyhow::{Context, Result, bail};
use liquida_core::{
    AmountField, EditOp, EditSession, HeaderField, ItemField, MonthField, SettlementResult,
};

use crate::cli::EditArgs;

fn header_field(name: &str) -> Option<HeaderField> {
    Some(match name {
        "claimant" | "reclamante" => HeaderField::Claimant,
        "respondent" | "reclamada" => HeaderField::Respondent,
        "case_number" | "numeroProcesso" => HeaderField::CaseNumber,
        "filing_date" | "dataAjuizamento" => HeaderField::FilingDate,
        "liquidation_date" | "dataLiquidacao" => HeaderField::LiquidationDate,
        "period_start" | "periodoCalculoInicio" => HeaderField::PeriodStart,
        "period_end" | "periodoCalculoFim" => HeaderField::PeriodEnd,
        "observation" => HeaderField::Observation,
        _ => return None,
    })
}

fn amount_field(name: &str) -> Option<AmountField> {
    Some(match name {
        "withholding_tax" | "inss" => AmountField::WithholdingTax,
        "income_tax" | "irrf" => AmountField::IncomeTax,
        "severance_fund" | "fgts" => AmountField::SeveranceFund,
        "fee_percent" | "honorariosPercentual" => AmountField::FeePercent,
        "employer_percent" | "percentualInssReclamada" => AmountField::EmployerPercent,
        _ => return None,
    })
}

fn item_field(name: &str) -> Option<ItemField> {
    Some(match name {
        "description" | "descricao" => ItemField::Description,
        "nature" | "natureza" => ItemField::Nature,
        "nominal" | "valor" => ItemField::Nominal,
        "corrected" | "valorCorrigido" => ItemField::Corrected,
        "interest" | "juros" => ItemField::Interest,
        _ => return None,
    })
}

fn month_field(name: &str) -> Option<MonthField> {
    Some(match name {
        "competence" | "competencia" => MonthField::Competence,
        "base" | "baseCalculo" => MonthField::Base,
        "quantity" | "quantidade" => MonthField::Quantity,
        "unit" | "unidade" => MonthField::Unit,
        "index" | "indice" => MonthField::Index,
        "nominal" | "valorNominal" => MonthField::Nominal,
        "corrected" | "valorCorrigido" => MonthField::Corrected,
        "interest" | "juros" => MonthField::Interest,
        _ => return None,
    })
}

fn index(segment: &str, path: &str) -> Result<usize> {
    segment
        .parse()
        .with_context(|| format!("invalid index {segment:?} in {path:?}"))
}

/// Parse `PATH=VALUE` into an edit operation. The value is passed through
/// untouched; numeric coercion happens in the edit session.
pub fn parse_assignment(input: &str) -> Result<EditOp> {
    let Some((path, value)) = input.split_once('=') else {
        bail!("expected PATH=VALUE, got {input:?}");
    };
    let path = path.trim();
    let value = value.to_string();
    let segments: Vec<&str> = path.split('.').collect();

    let op = match segments.as_slice() {
        [name] => {
            if let Some(field) = header_field(name) {
                EditOp::SetHeader(field, value)
            } else if let Some(field) = amount_field(name) {
                EditOp::SetAmount(field, value)
            } else {
                bail!("unknown field {name:?}");
            }
        }
        ["items", n, field] => {
            let field = item_field(field).with_context(|| format!("unknown item field {field:?}"))?;
            EditOp::SetItem(index(n, path)?, field, value)
        }
        ["items", n, "months", m, field] => {
            let field =
                month_field(field).with_context(|| format!("unknown monthly field {field:?}"))?;
            EditOp::SetMonth(index(n, path)?, index(m, path)?, field, value)
        }
        _ => bail!("unrecognised path {path:?}"),
    };
    Ok(op)
}

/// Parse `N.M` (item N, monthly row M).
pub fn parse_row_ref(input: &str) -> Result<(usize, usize)> {
    let (n, m) = input
        .split_once('.')
        .with_context(|| format!("expected N.M, got {input:?}"))?;
    Ok((index(n, input)?, index(m, input)?))
}

/// All operations requested on the command line, in application order.
/// Removals run highest index first so earlier indices stay valid.
pub fn collect_ops(args: &EditArgs) -> Result<Vec<EditOp>> {
    let mut ops: Vec<EditOp> = (0..args.add_item).map(|_| EditOp::AddItem).collect();
    ops.extend(args.add_month.iter().map(|&n| EditOp::AddMonth(n)));
    for assignment in &args.assignments {
        ops.push(parse_assignment(assignment)?);
    }

    let mut rows = args
        .remove_month
        .iter()
        .map(|r| parse_row_ref(r))
        .collect::<Result<Vec<_>>>()?;
    rows.sort_unstable_by(|a, b| b.cmp(a));
    rows.dedup();
    ops.extend(rows.into_iter().map(|(n, m)| EditOp::RemoveMonth(n, m)));

    let mut items = args.remove_item.clone();
    items.sort_unstable_by(|a, b| b.cmp(a));
    items.dedup();
    ops.extend(items.into_iter().map(EditOp::RemoveItem));
    Ok(ops)
}

/// Result of running command-line edits over a stored result.
#[derive(Debug)]
pub struct EditOutcome {
    pub result: SettlementResult,
    /// Operations that changed the working copy.
    pub changed: usize,
    /// The user's edits changed something worth saving.
    pub save: bool,
    /// The stored totals differed from the recomputed ones.
    pub stale: bool,
}

/// Apply `ops` in an edit session. The opening recompute alone never
/// triggers a save.
pub fn run_edits(result: SettlementResult, ops: Vec<EditOp>) -> EditOutcome {
    let mut session = EditSession::begin(result);
    let changed = session.apply_all(ops);
    let save = session.has_edits();
    let stale = session.was_stale();
    EditOutcome {
        result: session.commit(),
        changed,
        save,
        stale,
    }
}
