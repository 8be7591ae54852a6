//! Interpretation of free-form quarter values for aggregation.
//!
//! Stored quarter values keep whatever the user typed ("N/A", "12%", blank).
//! Only aggregation needs a number, and it gets one from here.

/// Numeric contribution of a quarter value.
///
/// Every character other than an ASCII digit, `.` or `-` is dropped and the
/// remainder is parsed as a float. Anything that does not parse contributes
/// `0.0`.
pub fn parse_quarter_value(value: &str) -> f64 {
    let token: String = value
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == '-')
        .collect();
    if token.is_empty() {
        return 0.0;
    }
    match token.parse::<f64>() {
        Ok(number) if number.is_finite() => number,
        _ => 0.0,
    }
}

/// Sum of the parsed contributions of a set of quarter values.
pub fn sum_quarters<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().map(parse_quarter_value).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_values_contribute_zero() {
        assert_eq!(parse_quarter_value(""), 0.0);
        assert_eq!(parse_quarter_value("N/A"), 0.0);
        assert_eq!(parse_quarter_value("none yet"), 0.0);
        assert_eq!(parse_quarter_value("   "), 0.0);
    }

    #[test]
    fn numeric_values_parse() {
        assert_eq!(parse_quarter_value("125"), 125.0);
        assert_eq!(parse_quarter_value("125%"), 125.0);
        assert_eq!(parse_quarter_value("-3.5"), -3.5);
        assert_eq!(parse_quarter_value(" 40 units"), 40.0);
    }

    #[test]
    fn malformed_tokens_contribute_zero() {
        assert_eq!(parse_quarter_value("1.2.3"), 0.0);
        assert_eq!(parse_quarter_value("--"), 0.0);
        assert_eq!(parse_quarter_value("5-10"), 0.0);
        assert_eq!(parse_quarter_value("."), 0.0);
    }

    #[test]
    fn sums_all_quarters() {
        assert_eq!(sum_quarters(["10", "N/A", "", "2.5%"]), 12.5);
    }
}
