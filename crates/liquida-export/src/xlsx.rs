//! XLSX workbooks: an analytic sheet per settlement (plus one sheet per
//! item breakdown) and the consolidated history listing.

use chrono::Local;
use liquida_core::{HistoryEntry, LineItem, SettlementResult};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::ExportError;

const CURRENCY_FORMAT: &str = "\"R$\" #,##0.00";
const INDEX_FORMAT: &str = "0.000000";
const PAPER_A4: u8 = 9;

fn currency() -> Format {
    Format::new().set_num_format(CURRENCY_FORMAT)
}

fn bold() -> Format {
    Format::new().set_bold()
}

fn landscape(ws: &mut Worksheet) {
    ws.set_landscape();
    ws.set_paper_size(PAPER_A4);
    ws.set_print_fit_to_pages(1, 0);
}

/// Labelled totals shown in the summary block, in display order.
fn summary_lines(r: &SettlementResult) -> [(&'static str, f64); 8] {
    [
        ("BRUTO DEVIDO (PRINCIPAL + JUROS)", r.gross_total),
        ("(-) INSS COTA EMPREGADO", r.withholding_tax),
        ("(-) IRRF RETIDO NA FONTE", r.income_tax),
        ("(+) FGTS (CRÉDITO AO RECLAMANTE)", r.severance_credit()),
        ("VALOR LÍQUIDO DEVIDO AO RECLAMANTE", r.net_total),
        ("HONORÁRIOS DE SUCUMBÊNCIA", r.fee_amount),
        ("COTA PATRONAL PREVIDENCIÁRIA", r.employer_charge),
        ("TOTAL GERAL DO DÉBITO (CUSTO DA RECLAMADA)", r.grand_total),
    ]
}

/// Workbook for one settlement.
pub fn settlement_workbook(result: &SettlementResult) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    summary_sheet(workbook.add_worksheet(), result)?;

    let mut breakdowns = 0;
    for (i, item) in result.items.iter().enumerate() {
        if item.has_breakdown() {
            breakdown_sheet(workbook.add_worksheet(), i + 1, item)?;
            breakdowns += 1;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    info!(items = result.items.len(), breakdowns, "rendered settlement workbook");
    Ok(bytes)
}

fn summary_sheet(ws: &mut Worksheet, r: &SettlementResult) -> Result<(), XlsxError> {
    let bold = bold();
    let money = currency();

    ws.set_name("Resumo da Liquidação")?;
    landscape(ws);
    ws.set_column_width(0, 50)?;
    for col in 1..=3 {
        ws.set_column_width(col, 18)?;
    }

    ws.write_string_with_format(
        0,
        0,
        "DEMONSTRATIVO DE LIQUIDAÇÃO JUDICIAL - PLANILHA ANALÍTICA",
        &bold,
    )?;

    ws.write_string_with_format(2, 0, "DADOS DA APURAÇÃO", &bold)?;
    let period = format!(
        "{} a {}",
        r.period_start.as_deref().unwrap_or("-"),
        r.period_end.as_deref().unwrap_or("-")
    );
    let case_rows = [
        ("Número do Processo:", r.case_number.as_str()),
        ("Reclamante:", r.claimant.as_str()),
        ("Reclamada:", r.respondent.as_str()),
        ("Período de Apuração:", period.as_str()),
    ];
    let mut row: u32 = 3;
    for (label, value) in case_rows {
        ws.write_string(row, 0, label)?;
        ws.write_string(row, 1, value)?;
        row += 1;
    }

    row += 1;
    ws.write_string_with_format(row, 0, "DEMONSTRATIVO DE VERBAS LIQUIDADAS", &bold)?;
    row += 1;
    for (col, title) in ["Rubrica", "Principal Corrigido", "Juros de Mora", "Total Bruto"]
        .into_iter()
        .enumerate()
    {
        ws.write_string_with_format(row, col as u16, title, &bold)?;
    }
    row += 1;
    for item in &r.items {
        ws.write_string(row, 0, item.description.to_uppercase())?;
        ws.write_number_with_format(row, 1, item.corrected, &money)?;
        ws.write_number_with_format(row, 2, item.interest, &money)?;
        ws.write_number_with_format(row, 3, item.total, &money)?;
        row += 1;
    }

    row += 2;
    ws.write_string_with_format(row, 0, "QUADRO RESUMO DE VALORES", &bold)?;
    row += 1;
    for (label, value) in summary_lines(r) {
        ws.write_string(row, 0, label)?;
        ws.write_number_with_format(row, 1, value, &money)?;
        row += 1;
    }

    if let Some(obs) = r.observation.as_deref() {
        row += 1;
        ws.write_string_with_format(row, 0, "OBSERVAÇÕES", &bold)?;
        ws.write_string(row + 1, 0, obs)?;
    }
    Ok(())
}

fn breakdown_sheet(ws: &mut Worksheet, number: usize, item: &LineItem) -> Result<(), XlsxError> {
    let bold = bold();
    let money = currency();
    let index = Format::new().set_num_format(INDEX_FORMAT);

    ws.set_name(format!("Verba {number}"))?;
    landscape(ws);
    ws.set_column_width(0, 14)?;
    for col in 1..=8 {
        ws.set_column_width(col, 16)?;
    }

    ws.write_string_with_format(0, 0, format!("{number} - {}", item.description.to_uppercase()), &bold)?;
    let header = [
        "Competência",
        "Base de Cálculo",
        "Quantidade",
        "Unidade",
        "Valor Nominal",
        "Índice",
        "Valor Corrigido",
        "Juros",
        "Total",
    ];
    for (col, title) in header.into_iter().enumerate() {
        ws.write_string_with_format(2, col as u16, title, &bold)?;
    }

    let mut row: u32 = 3;
    for m in &item.months {
        ws.write_string(row, 0, &m.competence)?;
        ws.write_number_with_format(row, 1, m.base, &money)?;
        if let Some(q) = m.quantity {
            ws.write_number(row, 2, q)?;
        }
        if let Some(unit) = m.unit.as_deref() {
            ws.write_string(row, 3, unit)?;
        }
        ws.write_number_with_format(row, 4, m.nominal, &money)?;
        ws.write_number_with_format(row, 5, m.effective_index(), &index)?;
        ws.write_number_with_format(row, 6, m.corrected, &money)?;
        ws.write_number_with_format(row, 7, m.interest, &money)?;
        ws.write_number_with_format(row, 8, m.total, &money)?;
        row += 1;
    }

    ws.write_string_with_format(row, 0, "TOTAL", &bold)?;
    ws.write_number_with_format(row, 4, item.nominal, &money)?;
    ws.write_number_with_format(row, 6, item.corrected, &money)?;
    ws.write_number_with_format(row, 7, item.interest, &money)?;
    ws.write_number_with_format(row, 8, item.total, &money)?;
    Ok(())
}

/// Consolidated listing of every history entry, most recent first.
pub fn history_workbook(entries: &[HistoryEntry]) -> Result<Vec<u8>, ExportError> {
    if entries.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    let bold = bold();
    let money = currency();

    ws.set_name("Histórico")?;
    for (col, width) in [20, 30, 25, 20].into_iter().enumerate() {
        ws.set_column_width(col as u16, width)?;
    }
    ws.write_string_with_format(0, 0, "Histórico Consolidado de Liquidações Judiciais", &bold)?;
    let header = [
        "Data de Apuração",
        "Arquivo Origem",
        "Nº Processo",
        "Total Geral do Débito",
    ];
    for (col, title) in header.into_iter().enumerate() {
        ws.write_string_with_format(2, col as u16, title, &bold)?;
    }

    for (i, entry) in entries.iter().enumerate() {
        let row = 3 + i as u32;
        let when = entry
            .created_at
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string();
        ws.write_string(row, 0, when)?;
        ws.write_string(row, 1, &entry.file_name)?;
        ws.write_string(row, 2, &entry.result.case_number)?;
        ws.write_number_with_format(row, 3, entry.result.grand_total, &money)?;
    }

    let bytes = workbook.save_to_buffer()?;
    info!(entries = entries.len(), "rendered history workbook");
    Ok(bytes)
}
