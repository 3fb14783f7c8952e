//! Integer-cent money helpers.

/// Formats cents as a plain decimal amount, e.g. `1250` -> `12.50`.
pub fn format_decimal(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Formats cents with a currency symbol and thousands separators, e.g. `$1,234.50`.
pub fn format_money(cents: i64, symbol: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let units = (abs / 100).to_string();
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}{}.{:02}", sign, symbol, grouped, abs % 100)
}

/// Parses a user-entered non-negative amount with at most two decimals into cents.
pub fn parse_amount(input: &str) -> Option<i64> {
    let trimmed = input.trim().trim_start_matches(['$', '€', '£']);
    if trimmed.is_empty() {
        return None;
    }
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if frac.len() > 2 || !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    whole.checked_mul(100)?.checked_add(frac_cents)
}

/// Percentage of an amount, rounded half up to the nearest cent.
pub fn percent_of(cents: i64, percent: i64) -> i64 {
    (cents * percent + 50) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_amounts() {
        assert_eq!(format_decimal(0), "0.00");
        assert_eq!(format_decimal(1250), "12.50");
        assert_eq!(format_money(123_456_789, "$"), "$1,234,567.89");
        assert_eq!(format_money(99, "€"), "€0.99");
    }

    #[test]
    fn parses_amounts() {
        assert_eq!(parse_amount("12"), Some(1200));
        assert_eq!(parse_amount("12.5"), Some(1250));
        assert_eq!(parse_amount("0.05"), Some(5));
        assert_eq!(parse_amount("$7.00"), Some(700));
        assert_eq!(parse_amount("-1"), None);
        assert_eq!(parse_amount("1.234"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn service_fee_rounds_to_cent() {
        assert_eq!(percent_of(1000, 5), 50);
        assert_eq!(percent_of(999, 5), 50);
        assert_eq!(percent_of(0, 5), 0);
    }
}
