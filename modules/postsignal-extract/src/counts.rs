use std::sync::LazyLock;

use regex::Regex;

static DECIMAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:E[+-]?\d+)?").expect("valid regex")
});
static INTEGER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?(\d+)").expect("valid regex"));

/// Convert an abbreviated count ("1.2K", "3m", "1,024") into an integer.
///
/// Only the leading number is read, so trailing text such as `"1.2K+"` is
/// fine. Total over all inputs: anything unparsable or negative is 0, and
/// values past `u64::MAX` saturate.
pub fn normalize_count(raw: &str) -> u64 {
    let s = raw.trim().to_uppercase().replace(',', "");
    if s.contains('K') {
        scaled(&s.replacen('K', "", 1), 1_000.0)
    } else if s.contains('M') {
        scaled(&s.replacen('M', "", 1), 1_000_000.0)
    } else {
        INTEGER_PREFIX
            .captures(&s)
            .map(|caps| caps[1].parse::<u64>().unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

fn scaled(num: &str, factor: f64) -> u64 {
    let Some(prefix) = DECIMAL_PREFIX.find(num.trim()) else {
        return 0;
    };
    match prefix.as_str().parse::<f64>() {
        // `as` saturates and truncates toward zero.
        Ok(v) if v > 0.0 => (v * factor) as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_integers() {
        assert_eq!(normalize_count("42"), 42);
        assert_eq!(normalize_count("  7 "), 7);
        assert_eq!(normalize_count("0"), 0);
        assert_eq!(normalize_count("+3"), 3);
    }

    #[test]
    fn thousands_and_millions() {
        assert_eq!(normalize_count("1.5K"), 1500);
        assert_eq!(normalize_count("1.2k"), 1200);
        assert_eq!(normalize_count("2M"), 2_000_000);
        assert_eq!(normalize_count("3.25m"), 3_250_000);
        assert_eq!(normalize_count(".5K"), 500);
    }

    #[test]
    fn trailing_text_after_the_number() {
        assert_eq!(normalize_count("1.2K+"), 1200);
        assert_eq!(normalize_count("3M followers"), 3_000_000);
        assert_eq!(normalize_count("42 reactions"), 42);
        assert_eq!(normalize_count("12.9"), 12);
    }

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(normalize_count("1.0009K"), 1000);
        assert_eq!(normalize_count("0.0000001M"), 0);
    }

    #[test]
    fn separators_are_ignored() {
        assert_eq!(normalize_count("1,024"), 1024);
        assert_eq!(normalize_count("1,234.5K"), 1_234_500);
    }

    #[test]
    fn garbage_is_zero() {
        assert_eq!(normalize_count(""), 0);
        assert_eq!(normalize_count("garbage"), 0);
        assert_eq!(normalize_count("K"), 0);
        assert_eq!(normalize_count("M"), 0);
        assert_eq!(normalize_count("NaNK"), 0);
        assert_eq!(normalize_count("infM"), 0);
        assert_eq!(normalize_count("reactions"), 0);
        assert_eq!(normalize_count("about 5"), 0);
    }

    #[test]
    fn negatives_are_zero() {
        assert_eq!(normalize_count("-5"), 0);
        assert_eq!(normalize_count("-1.5K"), 0);
    }

    #[test]
    fn huge_values_saturate() {
        assert_eq!(normalize_count("1e300K"), u64::MAX);
        assert_eq!(normalize_count("1e999M"), u64::MAX);
        assert_eq!(normalize_count("99999999999999999999999"), u64::MAX);
        assert_eq!(normalize_count("18446744073709551615"), u64::MAX);
    }
}
