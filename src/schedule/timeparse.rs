//! Lenient `HH:MM` parser producing seconds past midnight.
//!
//! Hours wrap modulo 24 instead of failing; minutes take at most the first two
//! digits after the colon and must land in `0..=59`. Anything else is `None`,
//! which list ordering treats as "after every valid time".

#![allow(missing_docs)]

/// Parse a free-form schedule string into seconds past midnight.
#[must_use]
pub fn parse_schedule(raw: &str) -> Option<u32> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let (head, tail) = text.split_once(':')?;

    // Hour: the digit run immediately before the colon.
    let hour_digits: String = head
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if hour_digits.is_empty() {
        return None;
    }
    // Fold long digit runs modulo 24 digit by digit so huge inputs cannot overflow.
    let hour = hour_digits
        .bytes()
        .fold(0u32, |acc, b| (acc * 10 + u32::from(b - b'0')) % 24);

    let minute_digits: Vec<u32> = tail
        .chars()
        .take(2)
        .map_while(|c| c.to_digit(10))
        .collect();
    if minute_digits.is_empty() {
        return None;
    }
    let minute = minute_digits.iter().fold(0u32, |acc, d| acc * 10 + d);
    if minute > 59 {
        return None;
    }

    Some(hour * 3600 + minute * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_times() {
        assert_eq!(parse_schedule("09:05"), Some(32_700));
        assert_eq!(parse_schedule("12:24"), Some(44_640));
        assert_eq!(parse_schedule("00:00"), Some(0));
        assert_eq!(parse_schedule("23:59"), Some(86_340));
    }

    #[test]
    fn single_digit_minute_accepted() {
        assert_eq!(parse_schedule("9:5"), Some(32_700));
    }

    #[test]
    fn hours_wrap_instead_of_failing() {
        assert_eq!(parse_schedule("25:10"), Some(3600 + 600));
        assert_eq!(parse_schedule("48:00"), Some(0));
    }

    #[test]
    fn out_of_range_minute_rejected() {
        assert_eq!(parse_schedule("25:70"), None);
        assert_eq!(parse_schedule("10:60"), None);
    }

    #[test]
    fn trailing_noise_ignored() {
        assert_eq!(parse_schedule("12:24xyz"), Some(44_640));
        assert_eq!(parse_schedule(" 12:245 "), Some(44_640));
        assert_eq!(parse_schedule("Dep 07:15 (exp)"), Some(7 * 3600 + 15 * 60));
    }

    #[test]
    fn malformed_inputs_rejected() {
        assert_eq!(parse_schedule(""), None);
        assert_eq!(parse_schedule("   "), None);
        assert_eq!(parse_schedule("1224"), None);
        assert_eq!(parse_schedule("12:"), None);
        assert_eq!(parse_schedule("12:x5"), None);
        assert_eq!(parse_schedule(":30"), None);
        assert_eq!(parse_schedule("bad"), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn never_panics_and_stays_within_a_day(raw in ".{0,16}") {
            if let Some(secs) = parse_schedule(&raw) {
                prop_assert!(secs < 86_400);
                prop_assert_eq!(secs % 60, 0);
            }
        }

        #[test]
        fn well_formed_times_round_trip(h in 0u32..24, m in 0u32..60) {
            let raw = format!("{h:02}:{m:02}");
            prop_assert_eq!(parse_schedule(&raw), Some(h * 3600 + m * 60));
        }
    }
}
