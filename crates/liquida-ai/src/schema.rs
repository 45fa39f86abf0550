//! Response schema sent with every request.
//!
//! The model is constrained to return a JSON object with these keys; they
//! match the serde names of [`liquida_core::SettlementResult`].

use serde_json::{Value, json};

fn number() -> Value {
    json!({ "type": "NUMBER" })
}

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn monthly_row() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "competencia": { "type": "STRING", "description": "Competência MM/AAAA ou referência do cálculo." },
            "baseCalculo": number(),
            "quantidade": number(),
            "unidade": string(),
            "valorNominal": { "type": "NUMBER", "description": "Valor apurado na competência." },
            "indice": number(),
            "valorCorrigido": number(),
            "juros": number(),
            "total": number()
        },
        "required": ["competencia", "valorNominal", "total", "baseCalculo"]
    })
}

fn line_item() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "descricao": { "type": "STRING", "description": "Descrição completa do pedido, com a alínea." },
            "valor": { "type": "NUMBER", "description": "Valor nominal total da rubrica." },
            "valorCorrigido": number(),
            "juros": number(),
            "total": number(),
            "natureza": { "type": "STRING", "enum": ["salarial", "indenizatoria"] },
            "detalhamentoMensal": {
                "type": "ARRAY",
                "description": "Memória de cálculo que leva ao valor total da rubrica.",
                "items": monthly_row()
            }
        },
        "required": ["descricao", "valor", "valorCorrigido", "juros", "total", "natureza", "detalhamentoMensal"]
    })
}

/// JSON schema for `generationConfig.responseSchema`.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "reclamante": string(),
            "reclamada": string(),
            "numeroProcesso": string(),
            "dataAjuizamento": string(),
            "dataLiquidacao": string(),
            "periodoCalculoInicio": string(),
            "periodoCalculoFim": string(),
            "verbas": {
                "type": "ARRAY",
                "description": "Todos os pedidos do documento, na ordem em que aparecem, sem omitir alíneas.",
                "items": line_item()
            },
            "totalBruto": number(),
            "inss": { "type": "NUMBER", "description": "INSS do segurado pela tabela progressiva." },
            "irrf": { "type": "NUMBER", "description": "IRRF pela sistemática de rendimentos acumulados." },
            "fgts": number(),
            "totalLiquido": number(),
            "juros": number(),
            "correcaoMonetaria": number(),
            "detalhesJurosCorrecao": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "periodo": string(),
                        "indice": string(),
                        "valorCorrecao": number(),
                        "valorJuros": number()
                    }
                }
            },
            "valorFinalCorrigido": number(),
            "honorariosPercentual": number(),
            "valorHonorarios": number(),
            "valorTotalGeral": number(),
            "inssReclamada": number(),
            "baseCalculoInssReclamada": number(),
            "percentualInssReclamada": number(),
            "isCalculationPossible": { "type": "BOOLEAN" },
            "errorReason": string(),
            "observation": string(),
            "calculationSource": { "type": "STRING", "enum": ["AI_CALCULATED", "CLAIMANT_PROVIDED_BASIS"] }
        },
        "required": [
            "reclamante", "reclamada", "numeroProcesso", "verbas",
            "totalBruto", "totalLiquido", "valorTotalGeral", "isCalculationPossible"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_keys_are_declared_properties() {
        let schema = response_schema();
        let props = schema["properties"].as_object().unwrap();
        for key in schema["required"].as_array().unwrap() {
            assert!(props.contains_key(key.as_str().unwrap()), "{key} missing");
        }
        let item = &props["verbas"]["items"];
        for key in item["required"].as_array().unwrap() {
            assert!(item["properties"].get(key.as_str().unwrap()).is_some());
        }
    }

    #[test]
    fn schema_keys_deserialize_into_result() {
        // The minimal object the schema demands is a valid result.
        let sample = json!({
            "reclamante": "A", "reclamada": "B", "numeroProcesso": "1",
            "verbas": [], "totalBruto": 0, "totalLiquido": 0,
            "valorTotalGeral": 0, "isCalculationPossible": true
        });
        let parsed: liquida_core::SettlementResult = serde_json::from_value(sample).unwrap();
        assert_eq!(parsed.respondent, "B");
        assert!(parsed.calculation_possible);
    }
}
