//! Value formatting for KPI tiles, badges, and table cells.

use serde_json::Value;

/// Rendered in place of a value that is missing or not a number.
pub const PLACEHOLDER: &str = "—";

/// Fixed-point rendering with the sign rules of a browser `toFixed`:
/// negative zero prints without a sign.
fn fixed(n: f64, digits: usize) -> String {
    let n = if n == 0.0 { 0.0 } else { n };
    format!("{n:.digits$}")
}

/// `$12.35M`, or the placeholder for NaN/infinite input.
pub fn money_m(v: f64) -> String {
    if !v.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("${}M", fixed(v, 2))
}

/// Signed percentage badge with one decimal: `+4.2%`, `-3.2%`.
pub fn pct_badge(v: f64) -> String {
    if !v.is_finite() {
        return format!("+{PLACEHOLDER}%");
    }
    let sign = if v >= 0.0 { "+" } else { "" };
    format!("{sign}{}%", fixed(v, 1))
}

/// Badge for a reduction: always rendered with a leading minus.
pub fn neg_pct_badge(v: f64) -> String {
    if !v.is_finite() {
        return format!("-{PLACEHOLDER}%");
    }
    format!("-{}%", fixed(v.abs(), 1))
}

/// Two-decimal percentage; non-numeric input counts as zero.
pub fn pct_plain(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    format!("{}%", fixed(v, 2))
}

/// Lenient numeric read of a JSON value: numbers and numeric strings parse,
/// everything else is NaN.
pub fn number_of(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Table cell text: null is empty, strings verbatim, everything else in
/// its JSON form.
pub fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_money() {
        assert_eq!(money_m(12.345), "$12.35M");
        assert_eq!(money_m(0.0), "$0.00M");
        assert_eq!(money_m(f64::NAN), PLACEHOLDER);
    }

    #[test]
    fn test_badges() {
        assert_eq!(pct_badge(-3.2), "-3.2%");
        assert_eq!(pct_badge(4.0), "+4.0%");
        assert_eq!(pct_badge(0.0), "+0.0%");
        assert_eq!(pct_badge(-0.0), "+0.0%");
        assert_eq!(pct_badge(f64::NAN), "+—%");
        assert_eq!(neg_pct_badge(2.5), "-2.5%");
        assert_eq!(neg_pct_badge(-2.5), "-2.5%");
        assert_eq!(neg_pct_badge(f64::NAN), "-—%");
    }

    #[test]
    fn test_plain_pct_treats_nan_as_zero() {
        assert_eq!(pct_plain(2.456), "2.46%");
        assert_eq!(pct_plain(f64::NAN), "0.00%");
    }

    #[test]
    fn test_number_of() {
        assert_eq!(number_of(&json!(3.5)), 3.5);
        assert_eq!(number_of(&json!(" 7 ")), 7.0);
        assert!(number_of(&json!("n/a")).is_nan());
        assert!(number_of(&Value::Null).is_nan());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!("DATA")), "DATA");
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&json!(true)), "true");
    }
}
