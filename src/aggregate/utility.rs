use std::cmp::Ordering;

/// Converts a delay in seconds to whole minutes, rounding halves upward
/// (`150 s` is 3 min, `-150 s` is -2 min).
pub fn minutes_from_seconds(seconds: i32) -> i64 {
    (f64::from(seconds) / 60.0 + 0.5).floor() as i64
}

/// Fraction `part / total`, or 0.0 for an empty total.
pub fn fraction(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Fraction as a whole percent.
pub fn whole_percent(fraction: f64) -> u32 {
    (fraction * 100.0).round() as u32
}

/// Leading ASCII digit run without its leading zeros, if the name starts
/// with a digit.
fn leading_integer(name: &str) -> Option<&str> {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    Some(name[..digits].trim_start_matches('0'))
}

/// Display order for route short names: numeric when both start with a
/// number, byte-wise otherwise. Digit runs of any length compare by value.
pub fn short_name_order(a: &str, b: &str) -> Ordering {
    match (leading_integer(a), leading_integer(b)) {
        (Some(x), Some(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_from_seconds() {
        assert_eq!(minutes_from_seconds(0), 0);
        assert_eq!(minutes_from_seconds(89), 1);
        assert_eq!(minutes_from_seconds(90), 2);
        assert_eq!(minutes_from_seconds(150), 3);
        assert_eq!(minutes_from_seconds(-150), -2);
        assert_eq!(minutes_from_seconds(-151), -3);
        assert_eq!(minutes_from_seconds(1200), 20);
    }

    #[test]
    fn test_fraction_with_zero_total() {
        assert_eq!(fraction(3, 0), 0.0);
        assert_eq!(fraction(1, 4), 0.25);
    }

    #[test]
    fn test_whole_percent() {
        assert_eq!(whole_percent(0.25), 25);
        assert_eq!(whole_percent(1.0 / 3.0), 33);
        assert_eq!(whole_percent(2.0 / 3.0), 67);
    }

    #[test]
    fn test_short_name_order() {
        assert_eq!(short_name_order("2", "10"), Ordering::Less);
        assert_eq!(short_name_order("10", "10A"), Ordering::Equal);
        assert_eq!(short_name_order("10", "Express"), Ordering::Less);
        assert_eq!(short_name_order("Blue", "Express"), Ordering::Less);
        assert_eq!(short_name_order("007", "7"), Ordering::Equal);
        assert_eq!(short_name_order("0", "00"), Ordering::Equal);
    }

    #[test]
    fn test_sorting_overlong_numbers() {
        let mut names = vec!["10", "2000000000000000000000", "3", "100000000000000000000A"];
        names.sort_by(|a, b| short_name_order(a, b));
        assert_eq!(
            names,
            vec!["3", "10", "100000000000000000000A", "2000000000000000000000"]
        );
    }

    #[test]
    fn test_sorting_mixed_short_names() {
        let mut names = vec!["Express", "10", "2", "#1", "1"];
        names.sort_by(|a, b| short_name_order(a, b));
        assert_eq!(names, vec!["#1", "1", "2", "10", "Express"]);
    }
}
