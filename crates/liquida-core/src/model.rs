//! Settlement types shared by extraction, history, editing and export.
//!
//! Field names follow the JSON contract agreed with the external model
//! (Portuguese keys), renamed to English on the Rust side. Deserialization
//! goes through [`crate::ingest`] so missing or malformed values become
//! zero/empty instead of failing.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest;

/// Legal nature of a claim. Only wage-type items feed the employer
/// social-charge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Nature {
    #[default]
    #[serde(rename = "salarial")]
    Wage,
    #[serde(rename = "indenizatoria")]
    Indemnity,
}

impl Nature {
    /// Map a wire tag to a nature. Unknown tags are treated as wage-type.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.starts_with("indeniz") || tag == "indemnity" || tag == "i" {
            Self::Indemnity
        } else {
            Self::Wage
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wage => "salarial",
            Self::Indemnity => "indenizatoria",
        }
    }

    /// One-letter column marker used in reports.
    pub fn short(&self) -> &'static str {
        match self {
            Self::Wage => "S",
            Self::Indemnity => "I",
        }
    }
}

/// Who produced the calculation basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalculationSource {
    #[serde(rename = "AI_CALCULATED")]
    AiCalculated,
    #[serde(rename = "CLAIMANT_PROVIDED_BASIS")]
    ClaimantProvidedBasis,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl CalculationSource {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "AI_CALCULATED" => Self::AiCalculated,
            "CLAIMANT_PROVIDED_BASIS" => Self::ClaimantProvidedBasis,
            _ => Self::Unspecified,
        }
    }
}

/// One competence period of a line item's calculation memory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlyBreakdown {
    #[serde(rename = "competencia", deserialize_with = "ingest::text")]
    pub competence: String,
    #[serde(rename = "baseCalculo", deserialize_with = "ingest::number")]
    pub base: f64,
    #[serde(
        rename = "quantidade",
        deserialize_with = "ingest::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<f64>,
    #[serde(
        rename = "unidade",
        deserialize_with = "ingest::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit: Option<String>,
    #[serde(
        rename = "indice",
        deserialize_with = "ingest::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub index: Option<f64>,
    #[serde(rename = "valorNominal", deserialize_with = "ingest::number")]
    pub nominal: f64,
    #[serde(rename = "valorCorrigido", deserialize_with = "ingest::number")]
    pub corrected: f64,
    #[serde(rename = "juros", deserialize_with = "ingest::number")]
    pub interest: f64,
    #[serde(rename = "total", deserialize_with = "ingest::number")]
    pub total: f64,
}

impl MonthlyBreakdown {
    /// Blank row appended by the editor: unit correction index, zero amounts.
    pub fn blank() -> Self {
        Self {
            quantity: Some(0.0),
            unit: Some(String::new()),
            index: Some(1.0),
            ..Self::default()
        }
    }

    /// Correction index, treating a missing or zero index as 1.
    pub fn effective_index(&self) -> f64 {
        match self.index {
            Some(i) if i != 0.0 => i,
            _ => 1.0,
        }
    }
}

/// A named monetary claim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    #[serde(rename = "descricao", deserialize_with = "ingest::text")]
    pub description: String,
    #[serde(rename = "valor", deserialize_with = "ingest::number")]
    pub nominal: f64,
    #[serde(rename = "valorCorrigido", deserialize_with = "ingest::number")]
    pub corrected: f64,
    #[serde(rename = "juros", deserialize_with = "ingest::number")]
    pub interest: f64,
    #[serde(rename = "total", deserialize_with = "ingest::number")]
    pub total: f64,
    #[serde(rename = "natureza", deserialize_with = "ingest::nature")]
    pub nature: Nature,
    #[serde(rename = "detalhamentoMensal", deserialize_with = "ingest::list")]
    pub months: Vec<MonthlyBreakdown>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, nature: Nature) -> Self {
        Self {
            description: description.into(),
            nature,
            ..Self::default()
        }
    }

    pub fn has_breakdown(&self) -> bool {
        !self.months.is_empty()
    }
}

/// Per-period correction/interest detail reported by the model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestDetail {
    #[serde(rename = "periodo", deserialize_with = "ingest::text")]
    pub period: String,
    #[serde(rename = "indice", deserialize_with = "ingest::text")]
    pub index: String,
    #[serde(rename = "valorCorrecao", deserialize_with = "ingest::number")]
    pub correction: f64,
    #[serde(rename = "valorJuros", deserialize_with = "ingest::number")]
    pub interest: f64,
}

/// Structured settlement calculation for one processed document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementResult {
    #[serde(rename = "reclamante", deserialize_with = "ingest::text")]
    pub claimant: String,
    #[serde(rename = "reclamada", deserialize_with = "ingest::text")]
    pub respondent: String,
    #[serde(rename = "numeroProcesso", deserialize_with = "ingest::text")]
    pub case_number: String,
    #[serde(
        rename = "dataAjuizamento",
        deserialize_with = "ingest::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub filing_date: Option<String>,
    #[serde(
        rename = "dataLiquidacao",
        deserialize_with = "ingest::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub liquidation_date: Option<String>,
    #[serde(
        rename = "periodoCalculoInicio",
        deserialize_with = "ingest::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub period_start: Option<String>,
    #[serde(
        rename = "periodoCalculoFim",
        deserialize_with = "ingest::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub period_end: Option<String>,
    #[serde(rename = "verbas", deserialize_with = "ingest::list")]
    pub items: Vec<LineItem>,
    /// Sum of corrected principal over all items.
    #[serde(rename = "totalBruto", deserialize_with = "ingest::number")]
    pub corrected_total: f64,
    /// Employee social-security withholding.
    #[serde(rename = "inss", deserialize_with = "ingest::number")]
    pub withholding_tax: f64,
    #[serde(rename = "irrf", deserialize_with = "ingest::number")]
    pub income_tax: f64,
    /// Severance-fund amount credited to the claimant.
    #[serde(
        rename = "fgts",
        deserialize_with = "ingest::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub severance_fund: Option<f64>,
    #[serde(rename = "totalLiquido", deserialize_with = "ingest::number")]
    pub net_total: f64,
    #[serde(rename = "juros", deserialize_with = "ingest::number")]
    pub interest_total: f64,
    #[serde(rename = "correcaoMonetaria", deserialize_with = "ingest::number")]
    pub monetary_correction: f64,
    #[serde(
        rename = "detalhesJurosCorrecao",
        deserialize_with = "ingest::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub interest_details: Vec<InterestDetail>,
    /// Corrected principal plus interest.
    #[serde(rename = "valorFinalCorrigido", deserialize_with = "ingest::number")]
    pub gross_total: f64,
    #[serde(rename = "honorariosPercentual", deserialize_with = "ingest::number")]
    pub fee_percent: f64,
    #[serde(rename = "valorHonorarios", deserialize_with = "ingest::number")]
    pub fee_amount: f64,
    #[serde(rename = "valorTotalGeral", deserialize_with = "ingest::number")]
    pub grand_total: f64,
    #[serde(
        rename = "observation",
        deserialize_with = "ingest::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub observation: Option<String>,
    /// Employer social-charge amount.
    #[serde(rename = "inssReclamada", deserialize_with = "ingest::number")]
    pub employer_charge: f64,
    #[serde(rename = "baseCalculoInssReclamada", deserialize_with = "ingest::number")]
    pub employer_charge_base: f64,
    #[serde(rename = "percentualInssReclamada", deserialize_with = "ingest::number")]
    pub employer_percent: f64,
    #[serde(rename = "isCalculationPossible", deserialize_with = "ingest::flag")]
    pub calculation_possible: bool,
    #[serde(rename = "errorReason", deserialize_with = "ingest::text")]
    pub error_reason: String,
    #[serde(rename = "calculationSource", deserialize_with = "ingest::calculation_source")]
    pub calculation_source: CalculationSource,
}

impl SettlementResult {
    /// Parse a model response or stored record, applying boundary defaults.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Placeholder recorded in history when processing a file failed.
    pub fn failed(reason: impl Into<String>, employer_percent: f64) -> Self {
        Self {
            claimant: "Erro".to_string(),
            respondent: "Erro".to_string(),
            case_number: "Erro".to_string(),
            employer_percent,
            calculation_possible: false,
            error_reason: reason.into(),
            ..Self::default()
        }
    }

    pub fn severance_credit(&self) -> f64 {
        self.severance_fund.unwrap_or(0.0)
    }
}

/// A processed document as kept in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub result: SettlementResult,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

impl HistoryEntry {
    /// Wrap a result under a fresh random id, timestamped now (millisecond
    /// precision, matching the stored form).
    pub fn new(file_name: impl Into<String>, result: SettlementResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            result,
            created_at: Utc::now().trunc_subsecs(3),
            observation: None,
        }
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        let observation = observation.into();
        if !observation.is_empty() {
            self.observation = Some(observation);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_parses_model_payload() {
        let json = r#"{
            "reclamante": "Maria da Silva",
            "reclamada": "ACME Ltda",
            "numeroProcesso": "0001234-56.2024.5.02.0001",
            "verbas": [{
                "descricao": "a) Horas extras",
                "valor": 1000,
                "valorCorrigido": 1100.5,
                "juros": 90,
                "total": 1190.5,
                "natureza": "salarial",
                "detalhamentoMensal": [{
                    "competencia": "01/2023",
                    "baseCalculo": 3000,
                    "valorNominal": 1000,
                    "indice": 1.1005,
                    "valorCorrigido": 1100.5,
                    "juros": 90,
                    "total": 1190.5
                }]
            }],
            "totalBruto": 1100.5,
            "inss": 100,
            "irrf": 0,
            "totalLiquido": 1090.5,
            "valorTotalGeral": 1443.6,
            "isCalculationPossible": true,
            "calculationSource": "AI_CALCULATED"
        }"#;
        let parsed = SettlementResult::from_json(json).unwrap();
        assert_eq!(parsed.claimant, "Maria da Silva");
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].nature, Nature::Wage);
        assert_eq!(parsed.items[0].months[0].index, Some(1.1005));
        assert_eq!(parsed.withholding_tax, 100.0);
        assert!(parsed.severance_fund.is_none());
        assert!(parsed.calculation_possible);
        assert_eq!(parsed.calculation_source, CalculationSource::AiCalculated);
    }

    #[test]
    fn malformed_fields_default() {
        let json = r#"{
            "reclamante": null,
            "numeroProcesso": 12345,
            "verbas": [{"descricao": "x", "valorCorrigido": "1.500,00", "natureza": "other", "detalhamentoMensal": null}],
            "detalhesJurosCorrecao": null,
            "inss": "abc",
            "fgts": "250,10",
            "isCalculationPossible": "true",
            "calculationSource": "SOMETHING_ELSE"
        }"#;
        let parsed = SettlementResult::from_json(json).unwrap();
        assert_eq!(parsed.claimant, "");
        assert_eq!(parsed.case_number, "12345");
        assert_eq!(parsed.items[0].corrected, 1500.0);
        assert_eq!(parsed.items[0].nature, Nature::Wage);
        assert!(parsed.items[0].months.is_empty());
        assert_eq!(parsed.withholding_tax, 0.0);
        assert_eq!(parsed.severance_fund, Some(250.1));
        assert!(parsed.calculation_possible);
        assert_eq!(parsed.calculation_source, CalculationSource::Unspecified);
    }

    #[test]
    fn empty_object_is_impossible_calculation() {
        let parsed = SettlementResult::from_json("{}").unwrap();
        assert!(!parsed.calculation_possible);
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.grand_total, 0.0);
    }

    #[test]
    fn serializes_wire_names() {
        let mut result = SettlementResult::default();
        result.items.push(LineItem::new("b) Multa 40%", Nature::Indemnity));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["verbas"][0]["natureza"], "indenizatoria");
        assert_eq!(value["calculationSource"], "");
        assert!(value.get("fgts").is_none());
        assert!(value.get("totalBruto").is_some());
    }

    #[test]
    fn nature_tags() {
        assert_eq!(Nature::from_tag("Indenizatória"), Nature::Indemnity);
        assert_eq!(Nature::from_tag("INDENIZATORIA"), Nature::Indemnity);
        assert_eq!(Nature::from_tag("salarial"), Nature::Wage);
        assert_eq!(Nature::from_tag(""), Nature::Wage);
    }

    #[test]
    fn failed_placeholder() {
        let failed = SettlementResult::failed("timeout", 23.0);
        assert_eq!(failed.claimant, "Erro");
        assert_eq!(failed.error_reason, "timeout");
        assert_eq!(failed.employer_percent, 23.0);
        assert!(!failed.calculation_possible);
    }

    #[test]
    fn history_entry_timestamp_in_millis() {
        let entry = HistoryEntry::new("a.pdf", SettlementResult::default());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["fileName"], "a.pdf");
        assert_eq!(
            value["timestamp"].as_i64().unwrap(),
            entry.created_at.timestamp_millis()
        );
        let back: HistoryEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn breakdown_effective_index() {
        let mut row = MonthlyBreakdown::blank();
        assert_eq!(row.effective_index(), 1.0);
        row.index = Some(0.0);
        assert_eq!(row.effective_index(), 1.0);
        row.index = Some(1.25);
        assert_eq!(row.effective_index(), 1.25);
    }
}
