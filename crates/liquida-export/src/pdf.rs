//! Landscape A4 settlement statement rendered with printpdf builtin fonts.
//!
//! Layout per result: header, parties block, line-item table, two-column
//! summary and, when any item carries a monthly breakdown, an appendix
//! with one table per item. Tables repeat their header after a page break.

use std::io::BufWriter;

use chrono::NaiveDate;
use liquida_core::{LineItem, MonthlyBreakdown, SettlementResult};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use tracing::info;

use crate::ExportError;
use crate::format::{format_brl, format_number};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const TOP: f32 = PAGE_HEIGHT - MARGIN - 3.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const ROW: f32 = 5.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica advance width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;

/// Render one or more settlements into a single PDF. Each result starts
/// on a fresh page.
pub fn render_report(
    results: &[SettlementResult],
    issued_on: NaiveDate,
) -> Result<Vec<u8>, ExportError> {
    if results.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut writer = ReportWriter::new("Demonstrativo de Liquidação")?;
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            writer.new_page();
        }
        writer.settlement(result, issued_on);
    }
    info!(results = results.len(), pages = writer.pages, "rendered PDF report");
    writer.finish()
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy)]
struct Column {
    x: f32,
    width: f32,
    align: Align,
}

impl Column {
    const fn new(x: f32, width: f32, align: Align) -> Self {
        Self { x, width, align }
    }
}

/// Lay out columns left to right from the margin.
fn columns(spec: &[(f32, Align)]) -> Vec<Column> {
    let mut x = MARGIN;
    spec.iter()
        .map(|&(width, align)| {
            let col = Column::new(x, width, align);
            x += width;
            col
        })
        .collect()
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH * PT_TO_MM
}

/// Truncate `text` so it fits in `width` mm, marking the cut with `...`.
fn fit(text: &str, size: f32, width: f32) -> String {
    if text_width(text, size) <= width {
        return text.to_string();
    }
    let max = (width / (size * GLYPH_WIDTH * PT_TO_MM)) as usize;
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Greedy word wrap into lines of at most `width` mm.
fn wrap(text: &str, size: f32, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if !line.is_empty() && text_width(&candidate, size) > width {
                lines.push(std::mem::take(&mut line));
                line = word.to_string();
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }
    lines
}

fn dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

struct ReportWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl ReportWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
            pages: 1,
        })
    }

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        let mut writer = BufWriter::new(Vec::<u8>::new());
        self.doc.save(&mut writer)?;
        writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
        self.pages += 1;
    }

    /// Break the page unless `needed` mm remain above the bottom margin.
    fn ensure(&mut self, needed: f32) {
        if self.y - needed < MARGIN {
            self.new_page();
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn cell(&self, text: &str, size: f32, col: &Column, bold: bool) {
        let text = fit(text, size, col.width - 2.0);
        let width = text_width(&text, size);
        let x = match col.align {
            Align::Left => col.x + 1.0,
            Align::Center => col.x + (col.width - width) / 2.0,
            Align::Right => col.x + col.width - 1.0 - width,
        };
        self.text(&text, size, x, bold);
    }

    fn rule(&self, from: f32, to: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(from), Mm(self.y)), false),
                (Point::new(Mm(to), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn row<S: AsRef<str>>(&mut self, columns: &[Column], cells: &[S], size: f32, bold: bool) {
        for (col, cell) in columns.iter().zip(cells) {
            self.cell(cell.as_ref(), size, col, bold);
        }
        self.y -= ROW;
    }

    fn header_row(&mut self, columns: &[Column], header: &[&str], size: f32) {
        self.ensure(ROW * 2.0);
        self.row(columns, header, size, true);
        self.y += ROW - 1.5;
        if let (Some(first), Some(last)) = (columns.first(), columns.last()) {
            self.rule(first.x, last.x + last.width);
        }
        self.y -= ROW - 1.5;
    }

    fn table(
        &mut self,
        columns: &[Column],
        header: &[&str],
        rows: &[Vec<String>],
        footer: Option<&[String]>,
        size: f32,
    ) {
        self.header_row(columns, header, size);
        for row in rows {
            if self.y - ROW < MARGIN {
                self.new_page();
                self.header_row(columns, header, size);
            }
            self.row(columns, row, size, false);
        }
        if let Some(footer) = footer {
            self.ensure(ROW * 2.0);
            self.y += ROW - 1.5;
            if let (Some(first), Some(last)) = (columns.first(), columns.last()) {
                self.rule(first.x, last.x + last.width);
            }
            self.y -= ROW - 1.5;
            self.row(columns, footer, size, true);
        }
    }

    fn section(&mut self, title: &str) {
        self.ensure(ROW * 4.0);
        self.text(title, 10.0, MARGIN, true);
        self.y -= 6.0;
    }

    fn settlement(&mut self, r: &SettlementResult, issued_on: NaiveDate) {
        let issued = issued_on.format("%d/%m/%Y").to_string();

        self.text("DEMONSTRATIVO DE LIQUIDAÇÃO DE SENTENÇA", 14.0, MARGIN, true);
        let info_x = PAGE_WIDTH - 85.0;
        self.text("Nº do Processo:", 8.0, info_x, false);
        let case_number = if r.case_number.trim().is_empty() {
            "N/I"
        } else {
            r.case_number.as_str()
        };
        self.text(case_number, 8.0, info_x + 22.0, true);
        self.y -= 4.0;
        self.text("Data de Emissão:", 8.0, info_x, false);
        self.text(&issued, 8.0, info_x + 22.0, false);
        self.y -= 6.0;
        self.rule(MARGIN, PAGE_WIDTH - MARGIN);
        self.y -= 8.0;

        self.parties(r, &issued);
        self.items(r);
        self.summary(r);
        self.notes(r);
        self.appendix(&r.items);
    }

    fn parties(&mut self, r: &SettlementResult, issued: &str) {
        let base_date = dash(r.liquidation_date.as_deref());
        let base_date = if base_date == "-" { issued } else { base_date };
        let rows = [
            (
                "RECLAMANTE:",
                r.claimant.to_uppercase(),
                "Início Cálc.:",
                dash(r.period_start.as_deref()),
            ),
            (
                "RECLAMADA:",
                r.respondent.to_uppercase(),
                "Fim Cálc.:",
                dash(r.period_end.as_deref()),
            ),
            (
                "AJUIZAMENTO:",
                dash(r.filing_date.as_deref()).to_string(),
                "Data Base:",
                base_date,
            ),
        ];
        for (label, value, label2, value2) in rows {
            self.text(label, 8.5, MARGIN, true);
            self.text(&fit(&value, 8.5, 155.0), 8.5, MARGIN + 25.0, false);
            self.text(label2, 8.5, MARGIN + 185.0, true);
            self.text(value2, 8.5, MARGIN + 210.0, false);
            self.y -= 4.5;
        }
        self.y -= 6.0;
    }

    fn items(&mut self, r: &SettlementResult) {
        self.section("1. DEMONSTRATIVO DAS VERBAS APURADAS");
        let cols = columns(&[
            (CONTENT_WIDTH - 144.0, Align::Left),
            (10.0, Align::Center),
            (32.0, Align::Right),
            (32.0, Align::Right),
            (32.0, Align::Right),
            (38.0, Align::Right),
        ]);
        let rows: Vec<Vec<String>> = r
            .items
            .iter()
            .map(|v| {
                vec![
                    v.description.to_uppercase(),
                    v.nature.short().to_string(),
                    format_brl(v.nominal),
                    format_brl(v.corrected),
                    format_brl(v.interest),
                    format_brl(v.total),
                ]
            })
            .collect();
        let footer = [
            "TOTAIS ACUMULADOS".to_string(),
            String::new(),
            String::new(),
            format_brl(r.corrected_total),
            format_brl(r.interest_total),
            format_brl(r.gross_total),
        ];
        self.table(
            &cols,
            &[
                "Rubrica Apurada",
                "Nat.",
                "Vl. Nominal",
                "Princ. Corrigido",
                "Juros (SELIC)",
                "Total Bruto",
            ],
            &rows,
            Some(&footer[..]),
            7.5,
        );
        self.y -= 6.0;
    }

    fn summary(&mut self, r: &SettlementResult) {
        self.section("2. QUADRO RESUMO DO DÉBITO ATUALIZADO");
        let half = (CONTENT_WIDTH - MARGIN) / 2.0;
        let cols = [
            Column::new(MARGIN, half - 40.0, Align::Left),
            Column::new(MARGIN + half - 40.0, 40.0, Align::Right),
            Column::new(2.0 * MARGIN + half, half - 40.0, Align::Left),
            Column::new(2.0 * MARGIN + 2.0 * half - 40.0, 40.0, Align::Right),
        ];
        let left = [
            ("(+) Principal Corrigido Bruto", format_brl(r.corrected_total)),
            ("(+) Juros de Mora (SELIC)", format_brl(r.interest_total)),
            (
                "(-) Previdência Social (Segurado)",
                format!("({})", format_brl(r.withholding_tax)),
            ),
            (
                "(-) Imposto de Renda (IRRF)",
                format!("({})", format_brl(r.income_tax)),
            ),
            ("(+) FGTS Apurado", format_brl(r.severance_credit())),
        ];
        let right = [
            ("Total da Condenação (Bruto)", format_brl(r.gross_total)),
            ("Honorários de Sucumbência", format_brl(r.fee_amount)),
            ("Cota Patronal (INSS)", format_brl(r.employer_charge)),
        ];
        let rows: Vec<Vec<String>> = (0..left.len())
            .map(|i| {
                let (ll, lv) = &left[i];
                let (rl, rv) = right
                    .get(i)
                    .map(|(l, v)| (l.to_string(), v.clone()))
                    .unwrap_or_default();
                vec![ll.to_string(), lv.clone(), rl, rv]
            })
            .collect();
        let footer = [
            "VALOR LÍQUIDO DEVIDO AO RECLAMANTE".to_string(),
            format_brl(r.net_total),
            "TOTAL GERAL DO DÉBITO".to_string(),
            format_brl(r.grand_total),
        ];
        self.table(
            &cols,
            &[
                "CONTA DO RECLAMANTE",
                "VALOR (R$)",
                "ENCARGOS DA RECLAMADA",
                "VALOR (R$)",
            ],
            &rows,
            Some(&footer[..]),
            8.0,
        );
        self.y -= 6.0;
    }

    fn notes(&mut self, r: &SettlementResult) {
        let mut lines = Vec::new();
        if !r.calculation_possible && !r.error_reason.is_empty() {
            lines.push(format!("Cálculo não realizado: {}", r.error_reason));
        }
        if let Some(obs) = r.observation.as_deref().filter(|o| !o.trim().is_empty()) {
            lines.push(format!("Observações: {obs}"));
        }
        if lines.is_empty() {
            return;
        }
        self.section("3. OBSERVAÇÕES");
        for line in lines.iter().flat_map(|l| wrap(l, 8.0, CONTENT_WIDTH)) {
            self.ensure(4.0);
            self.text(&line, 8.0, MARGIN, false);
            self.y -= 4.0;
        }
    }

    fn appendix(&mut self, items: &[LineItem]) {
        if !items.iter().any(LineItem::has_breakdown) {
            return;
        }
        self.new_page();
        self.text("ANEXO I - MEMÓRIA DE CÁLCULO MENSAL DISCRIMINADA", 12.0, MARGIN, true);
        self.y -= 8.0;

        let cols = columns(&[
            (20.0, Align::Center),
            (35.0, Align::Right),
            (35.0, Align::Right),
            (35.0, Align::Center),
            (35.0, Align::Right),
            (35.0, Align::Right),
            (CONTENT_WIDTH - 195.0, Align::Right),
        ]);
        for (i, item) in items.iter().enumerate().filter(|(_, v)| v.has_breakdown()) {
            self.ensure(38.0);
            let title = format!("{}.1 - {}", i + 1, item.description.to_uppercase());
            self.text(&fit(&title, 9.0, CONTENT_WIDTH), 9.0, MARGIN, true);
            self.y -= 5.0;
            let rows: Vec<Vec<String>> = item.months.iter().map(month_row).collect();
            self.table(
                &cols,
                &[
                    "Comp.",
                    "Base Cálculo",
                    "Vl. Nominal",
                    "Índice",
                    "Princ. Corr.",
                    "Juros SELIC",
                    "Subtotal",
                ],
                &rows,
                None,
                6.5,
            );
            self.y -= 6.0;
        }
    }
}

fn month_row(m: &MonthlyBreakdown) -> Vec<String> {
    vec![
        m.competence.clone(),
        format_brl(m.base),
        format_brl(m.nominal),
        format_number(m.effective_index(), 6),
        format_brl(m.corrected),
        format_brl(m.interest),
        format_brl(m.total),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use liquida_core::Nature;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 30).unwrap()
    }

    fn sample(items: usize, months: usize) -> SettlementResult {
        let mut r = SettlementResult {
            claimant: "Maria da Silva".into(),
            respondent: "ACME Ltda".into(),
            case_number: "0001234-56.2024.5.02.0001".into(),
            observation: Some("Juros pela SELIC desde o ajuizamento.".into()),
            calculation_possible: true,
            employer_percent: 20.0,
            ..SettlementResult::default()
        };
        for i in 0..items {
            let mut item = LineItem::new(format!("{}) Horas extras", i + 1), Nature::Wage);
            for m in 0..months {
                let mut row = MonthlyBreakdown::blank();
                row.competence = format!("{:02}/2023", m % 12 + 1);
                row.nominal = 100.0;
                row.corrected = 110.0;
                row.interest = 5.0;
                item.months.push(row);
            }
            r.items.push(item);
        }
        liquida_core::recompute_in_place(&mut r);
        r
    }

    #[test]
    fn renders_pdf_bytes() {
        let bytes = render_report(&[sample(3, 2)], date()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_selection_is_an_error() {
        assert!(matches!(render_report(&[], date()), Err(ExportError::Empty)));
    }

    #[test]
    fn long_tables_break_pages() {
        let mut writer = ReportWriter::new("t").unwrap();
        writer.settlement(&sample(60, 0), date());
        assert!(writer.pages > 1);
    }

    #[test]
    fn breakdown_adds_appendix_page() {
        let mut without = ReportWriter::new("t").unwrap();
        without.settlement(&sample(2, 0), date());
        let mut with = ReportWriter::new("t").unwrap();
        with.settlement(&sample(2, 40), date());
        assert_eq!(without.pages, 1);
        assert!(with.pages >= 3);
    }

    #[test]
    fn fit_and_wrap() {
        let long = "X".repeat(200);
        let fitted = fit(&long, 8.0, 30.0);
        assert!(fitted.ends_with("..."));
        assert!(text_width(&fitted, 8.0) <= 30.0);
        assert_eq!(fit("curto", 8.0, 30.0), "curto");

        let lines = wrap("uma frase com varias palavras", 8.0, 15.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| !l.is_empty()));
    }
}
