//! Lenient conversions applied when a settlement enters the system.
//!
//! The external model and older history files do not always honour the
//! schema: amounts arrive as strings (`"1.234,56"`), `null`, or are missing
//! entirely. Every numeric field is coerced here exactly once, so code past
//! the boundary can treat the model as fully populated.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::{CalculationSource, Nature};

/// Parse a user- or model-supplied decimal, defaulting to zero.
///
/// Accepts plain decimals (`"1234.5"`), pt-BR formatting (`"1.234,56"`,
/// `"R$ 10,00"`, `"1.234.567"`, `"R$ 1.500"`) and comma decimals (`"0,5"`).
/// A lone dot without a currency prefix is a decimal point. Anything unparseable or
/// non-finite yields `0.0`.
pub fn parse_decimal(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let currency = trimmed.starts_with("R$");
    let cleaned: String = trimmed
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        // "1.234,56": dots group thousands, comma is the decimal mark.
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        // "1,234.56": commas group thousands.
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        // "1,234,567": several commas can only be grouping.
        (None, Some(_)) if cleaned.matches(',').count() > 1 => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        // "1.234.567": several dots can only be grouping.
        (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        // "R$ 1.500": a currency amount with three digits after the dot.
        (Some(dot), None) if currency && cleaned.len() - dot - 1 == 3 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Coerce an arbitrary JSON value to a finite number.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_decimal(s),
        _ => 0.0,
    }
}

pub(crate) fn number<'de, D>(de: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().map(coerce_number).unwrap_or(0.0))
}

pub(crate) fn optional_number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(coerce_number(&v)),
    })
}

pub(crate) fn list<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(de)?.unwrap_or_default())
}

pub(crate) fn text<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

pub(crate) fn optional_text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn flag<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

pub(crate) fn nature<'de, D>(de: D) -> Result<Nature, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::String(s)) => Nature::from_tag(&s),
        _ => Nature::default(),
    })
}

pub(crate) fn calculation_source<'de, D>(de: D) -> Result<CalculationSource, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::String(s)) => CalculationSource::from_tag(&s),
        _ => CalculationSource::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_decimal() {
        assert_eq!(parse_decimal("1234.5"), 1234.5);
        assert_eq!(parse_decimal("  42 "), 42.0);
        assert_eq!(parse_decimal("-3.25"), -3.25);
    }

    #[test]
    fn pt_br_formatting() {
        assert_eq!(parse_decimal("1.234,56"), 1234.56);
        assert_eq!(parse_decimal("R$ 10,00"), 10.0);
        assert_eq!(parse_decimal("0,5"), 0.5);
    }

    #[test]
    fn grouped_amounts_without_decimals() {
        assert_eq!(parse_decimal("1.234.567"), 1_234_567.0);
        assert_eq!(parse_decimal("R$ 1.500"), 1500.0);
        assert_eq!(parse_decimal("R$ 1.234.567,89"), 1_234_567.89);
        assert_eq!(parse_decimal("1,234,567"), 1_234_567.0);
        // Without a currency prefix a single dot stays a decimal point.
        assert_eq!(parse_decimal("1.500"), 1.5);
        assert_eq!(parse_decimal("R$ 1.5"), 1.5);
    }

    #[test]
    fn us_thousands_separator() {
        assert_eq!(parse_decimal("1,234.56"), 1234.56);
    }

    #[test]
    fn garbage_defaults_to_zero() {
        assert_eq!(parse_decimal(""), 0.0);
        assert_eq!(parse_decimal("abc"), 0.0);
        assert_eq!(parse_decimal("NaN"), 0.0);
        assert_eq!(parse_decimal("inf"), 0.0);
    }

    #[test]
    fn coerce_json_values() {
        assert_eq!(coerce_number(&json!(12.5)), 12.5);
        assert_eq!(coerce_number(&json!("7,25")), 7.25);
        assert_eq!(coerce_number(&json!(null)), 0.0);
        assert_eq!(coerce_number(&json!(true)), 0.0);
        assert_eq!(coerce_number(&json!([1, 2])), 0.0);
    }
}
