//! Bibliographic identifier resolution from bag names
//!
//! Bag names embed dates (often 8 digits) ahead of the true identifier,
//! so neither first-match nor fixed-position rules are safe.

use once_cell::sync::Lazy;
use regex::Regex;

/// An MMS ID is 8 to 19 digits (the first two digits carry the record
/// type, the last four a unique institution code).
const MIN_LEN: usize = 8;
const MAX_LEN: usize = 19;

// `[0-9]+` matches are maximal runs, which gives the "not adjacent to
// another digit" guarantee without lookaround.
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("static pattern"));

/// Resolve the MMS ID embedded in a bag name
///
/// Returns the rightmost run of 8-19 digits that is not flanked by other
/// digits and does not sit at the very start of the name (where dates
/// live), or `None` when the name carries no identifier.
pub fn resolve(bag_name: &str) -> Option<String> {
    DIGIT_RUN
        .find_iter(bag_name)
        .filter(|m| m.start() > 0)
        .filter(|m| (MIN_LEN..=MAX_LEN).contains(&m.len()))
        .last()
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_id_at_end_of_name() {
        assert_eq!(
            resolve("Tyler_2019_9876543210987").as_deref(),
            Some("9876543210987")
        );
    }

    #[test]
    fn skips_eight_digit_date_before_id() {
        assert_eq!(
            resolve("Tyler_20191231_9876543210987").as_deref(),
            Some("9876543210987")
        );
        assert_eq!(
            resolve("Tyler_20191231_9876543210987_ver2").as_deref(),
            Some("9876543210987")
        );
    }

    #[test]
    fn skips_date_at_start_of_name() {
        assert_eq!(
            resolve("20191231_Tyler_ver2_9876543210987").as_deref(),
            Some("9876543210987")
        );
        assert_eq!(
            resolve("2019_Tyler_9876543210987").as_deref(),
            Some("9876543210987")
        );
        assert_eq!(
            resolve("2019_Tyler_9876543210987_ver2").as_deref(),
            Some("9876543210987")
        );
        assert_eq!(
            resolve("2019_Tyler_ver2_9876543210987").as_deref(),
            Some("9876543210987")
        );
    }

    #[test]
    fn prefers_rightmost_candidate() {
        assert_eq!(
            resolve("x_11111111_9876543210987").as_deref(),
            Some("9876543210987")
        );
    }

    #[test]
    fn name_without_id_yields_none() {
        assert_eq!(resolve("Tyler_2019"), None);
        assert_eq!(resolve("2019_Tyler"), None);
        assert_eq!(resolve("Tyler_2019_ver2"), None);
        assert_eq!(resolve("2019_Tyler_ver2"), None);
    }

    #[test]
    fn run_length_bounds_are_enforced() {
        // 7 digits: too short
        assert_eq!(resolve(&format!("2019_Tyler_{}", "9".repeat(7))), None);
        // 20 digits: too long
        assert_eq!(resolve(&format!("2019_Tyler_{}", "9".repeat(20))), None);
        // boundary lengths are accepted
        assert_eq!(
            resolve(&format!("2019_Tyler_{}", "9".repeat(8))).as_deref(),
            Some("99999999")
        );
        assert_eq!(
            resolve(&format!("2019_Tyler_{}", "9".repeat(19))).as_deref(),
            Some("9999999999999999999")
        );
    }

    #[test]
    fn id_at_position_zero_is_rejected() {
        assert_eq!(resolve("9876543210987"), None);
        assert_eq!(resolve("9876543210987_Tyler"), None);
    }
}
