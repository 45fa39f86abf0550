//! pt-BR number formatting: `.` groups thousands, `,` separates decimals.

/// Format `value` with a fixed number of decimals. Non-finite values
/// render as zero.
pub fn format_number(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let digits = format!("{:.*}", decimals, value.abs());
    let (int_part, dec_part) = match digits.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + int_part.len() / 3 + 1);
    // Rounding can turn a tiny negative into zero; no sign then.
    if value < 0.0 && digits.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        out.push('-');
    }
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if let Some(dec) = dec_part {
        out.push(',');
        out.push_str(dec);
    }
    out
}

/// Brazilian real, e.g. `R$ 1.234,56` or `-R$ 10,00`.
pub fn format_brl(value: f64) -> String {
    let formatted = format_number(value, 2);
    match formatted.strip_prefix('-') {
        Some(abs) => format!("-R$ {abs}"),
        None => format!("R$ {formatted}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1.234.567,89");
        assert_eq!(format_number(999.0, 2), "999,00");
        assert_eq!(format_number(1000.0, 0), "1.000");
        assert_eq!(format_number(1.0055, 6), "1,005500");
    }

    #[test]
    fn currency() {
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(-10.0), "-R$ 10,00");
        assert_eq!(format_brl(-0.001), "R$ 0,00");
        assert_eq!(format_brl(f64::NAN), "R$ 0,00");
    }
}
