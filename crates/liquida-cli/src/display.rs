//! Terminal rendering of history entries.

use std::fmt::Write;

use chrono::Local;
use liquida_core::{HistoryEntry, LineItem, SettlementResult};
use liquida_export::{format_brl, format_number};

const MAX_LIST_ITEMS: usize = 12;

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

fn local_time(entry: &HistoryEntry) -> String {
    entry
        .created_at
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// One line per entry: short id, date, file, case number, grand total.
pub fn history_table(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "(history is empty)\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8}  {:<16}  {:<28}  {:<26}  {:>18}",
        "ID", "DATA", "ARQUIVO", "PROCESSO", "TOTAL GERAL"
    );
    for e in entries {
        let total = if e.result.calculation_possible {
            format_brl(e.result.grand_total)
        } else {
            "erro".to_string()
        };
        let file: String = e.file_name.chars().take(28).collect();
        let case: String = e.result.case_number.chars().take(26).collect();
        let _ = writeln!(
            out,
            "{:<8}  {:<16}  {:<28}  {:<26}  {:>18}",
            short_id(&e.id),
            local_time(e),
            file,
            case,
            total
        );
    }
    out
}

/// Vertical card with parties, line items and the summary block.
pub fn settlement_card(entry: &HistoryEntry) -> String {
    let r = &entry.result;
    let mut out = String::new();

    let _ = writeln!(out, "=== {} x {} ===", r.claimant, r.respondent);
    let _ = writeln!(out, "{} ({}, {})", entry.file_name, short_id(&entry.id), local_time(entry));
    let _ = writeln!(out);

    if !r.calculation_possible {
        let _ = writeln!(out, "Cálculo não realizado");
        let _ = writeln!(out, "  {}", or_dash(Some(&r.error_reason)));
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Processo");
    field(&mut out, "número", &r.case_number);
    field(&mut out, "ajuizamento", or_dash(r.filing_date.as_deref()));
    field(&mut out, "data base", or_dash(r.liquidation_date.as_deref()));
    field(
        &mut out,
        "período",
        &format!(
            "{} a {}",
            or_dash(r.period_start.as_deref()),
            or_dash(r.period_end.as_deref())
        ),
    );
    let _ = writeln!(out);

    if !r.items.is_empty() {
        let _ = writeln!(out, "Verbas ({})", r.items.len());
        for (i, item) in r.items.iter().enumerate() {
            write_item(&mut out, i, item);
        }
        let _ = writeln!(out);
    }

    write_summary(&mut out, r);

    if let Some(obs) = r.observation.as_deref().or(entry.observation.as_deref()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "Observações");
        let _ = writeln!(out, "  {obs}");
    }
    out
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {label:<26} {value}");
}

fn money(out: &mut String, label: &str, value: f64) {
    let _ = writeln!(out, "  {label:<40} {:>18}", format_brl(value));
}

fn write_item(out: &mut String, i: usize, item: &LineItem) {
    let _ = writeln!(
        out,
        "  [{i}] {} ({})  nominal {}  corrigido {}  juros {}  total {}",
        item.description,
        item.nature.short(),
        format_brl(item.nominal),
        format_brl(item.corrected),
        format_brl(item.interest),
        format_brl(item.total)
    );
    let shown = item.months.len().min(MAX_LIST_ITEMS);
    for (m, row) in item.months.iter().take(shown).enumerate() {
        let _ = writeln!(
            out,
            "      {m:>3}. {:<8} nominal {:>14}  índice {}  corrigido {:>14}  juros {:>12}  total {:>14}",
            row.competence,
            format_brl(row.nominal),
            format_number(row.effective_index(), 6),
            format_brl(row.corrected),
            format_brl(row.interest),
            format_brl(row.total)
        );
    }
    if item.months.len() > shown {
        let _ = writeln!(out, "      ... and {} more", item.months.len() - shown);
    }
}

fn write_summary(out: &mut String, r: &SettlementResult) {
    let _ = writeln!(out, "Resumo");
    money(out, "(+) principal corrigido", r.corrected_total);
    money(out, "(+) juros de mora", r.interest_total);
    money(out, "(=) bruto", r.gross_total);
    money(out, "(-) INSS segurado", r.withholding_tax);
    money(out, "(-) IRRF", r.income_tax);
    money(out, "(+) FGTS", r.severance_credit());
    money(out, "líquido ao reclamante", r.net_total);
    money(
        out,
        &format!("honorários ({}%)", format_number(r.fee_percent, 2)),
        r.fee_amount,
    );
    money(
        out,
        &format!("INSS patronal ({}%)", format_number(r.employer_percent, 2)),
        r.employer_charge,
    );
    money(out, "total geral do débito", r.grand_total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use liquida_core::{MonthlyBreakdown, Nature};

    fn entry() -> HistoryEntry {
        let mut item = LineItem::new("a) Horas extras", Nature::Wage);
        for m in 0..15 {
            let mut row = MonthlyBreakdown::blank();
            row.competence = format!("{:02}/2023", m % 12 + 1);
            row.corrected = 10.0;
            item.months.push(row);
        }
        let mut r = SettlementResult {
            claimant: "Ana".into(),
            respondent: "ACME".into(),
            case_number: "0001".into(),
            items: vec![item],
            employer_percent: 20.0,
            calculation_possible: true,
            ..SettlementResult::default()
        };
        liquida_core::recompute_in_place(&mut r);
        HistoryEntry::new("inicial.pdf", r).with_observation("usar SELIC")
    }

    #[test]
    fn card_shows_parties_items_and_totals() {
        let card = settlement_card(&entry());
        assert!(card.starts_with("=== Ana x ACME ==="));
        assert!(card.contains("[0] a) Horas extras (S)"));
        assert!(card.contains("... and 3 more"));
        assert!(card.contains("R$ 150,00"));
        assert!(card.contains("INSS patronal (20,00%)"));
        assert!(card.contains("usar SELIC"));
    }

    #[test]
    fn failed_entry_shows_reason() {
        let e = HistoryEntry::new("x.pdf", SettlementResult::failed("timeout", 23.0));
        let card = settlement_card(&e);
        assert!(card.contains("Cálculo não realizado\n  timeout"));
        assert!(history_table(&[e]).contains("erro"));
    }

    #[test]
    fn empty_history() {
        assert_eq!(history_table(&[]), "(history is empty)\n");
    }
}
