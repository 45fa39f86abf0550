//! Deterministic output file names.

pub const CONSOLIDATED_PDF: &str = "CONSOLIDADO_LIQUIDACOES_JUDICIAIS.pdf";
pub const HISTORY_XLSX: &str = "Historico_Consolidado_Liquidacoes.xlsx";

/// `DEMONSTRATIVO_LIQUIDACAO_<CLAIMANT>.pdf`: upper-cased, whitespace
/// replaced by `_`, at most 30 characters. Path separators are replaced
/// too so the name stays a single component.
pub fn settlement_pdf(claimant: &str) -> String {
    let claimant = claimant.trim();
    let base = if claimant.is_empty() { "CALCULO" } else { claimant };
    let safe: String = base
        .to_uppercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .take(30)
        .collect();
    format!("DEMONSTRATIVO_LIQUIDACAO_{safe}.pdf")
}

/// `Liquidacao_<stem>.xlsx`, where `<stem>` is the source file name
/// without its extension.
pub fn settlement_xlsx(source_file: &str) -> String {
    let stem = match source_file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => source_file,
    };
    let safe: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    let safe = if safe.is_empty() { "calculo".to_string() } else { safe };
    format!("Liquidacao_{safe}.xlsx")
}
