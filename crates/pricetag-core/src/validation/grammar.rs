//! Per-promo argument grammars.
//!
//! Integers are ASCII only. Positive integers carry no leading zero and
//! percentages are `0..=100` without leading zeros.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::label::PromoCode;

lazy_static! {
    // Compact schema: the single `promo_args` string.
    static ref ARGS_NONE: Regex = Regex::new(r"^$").unwrap();

    static ref ARGS_SUP: Regex = Regex::new(r"^(?:[1-9][0-9]*)?$").unwrap();

    static ref ARGS_DISC: Regex = Regex::new(r"^(?:100|[1-9]?[0-9])$").unwrap();

    static ref ARGS_DEALPCT: Regex = Regex::new(
        r"^[1-9][0-9]*:(?:100|[1-9]?[0-9])$"
    ).unwrap();

    static ref ARGS_DEALFIX: Regex = Regex::new(r"^[1-9][0-9]*=[0-9]+\.[0-9]{2}$").unwrap();

    static ref ARGS_BXYG: Regex = Regex::new(r"^[1-9][0-9]*:[1-9][0-9]*$").unwrap();

    // N, N:P, AxB, AxB:P, joined by `|`
    static ref ARGS_PACK: Regex = Regex::new(
        r"^(?:[1-9][0-9]*(?:x[1-9][0-9]*)?(?::(?:100|[1-9]?[0-9]))?)(?:\|(?:[1-9][0-9]*(?:x[1-9][0-9]*)?(?::(?:100|[1-9]?[0-9]))?))*$"
    ).unwrap();

    // Decomposed schema: `core` per promo, shared `cond` and `nth`.
    static ref CORE_EMPTY: Regex = Regex::new(r"^$").unwrap();

    static ref CORE_DEALFIX: Regex = Regex::new(r"^[0-9]+\.[0-9]{2}$").unwrap();

    static ref COND: Regex = Regex::new(
        r"^(?:|[1-9][0-9]*|[1-9][0-9]*x[1-9][0-9]*(?:\|[1-9][0-9]*x[1-9][0-9]*)*)$"
    ).unwrap();

    static ref NTH: Regex = Regex::new(r"^(?:|[2-9]|[1-9][0-9]+)$").unwrap();
}

/// Grammar of the compact `promo_args` field.
pub fn promo_args_pattern(promo: PromoCode) -> &'static Regex {
    match promo {
        PromoCode::None => &ARGS_NONE,
        PromoCode::Sup => &ARGS_SUP,
        PromoCode::Disc => &ARGS_DISC,
        PromoCode::DealPct => &ARGS_DEALPCT,
        PromoCode::DealFix => &ARGS_DEALFIX,
        PromoCode::Bxyg => &ARGS_BXYG,
        PromoCode::Pack => &ARGS_PACK,
    }
}

/// Grammar of the decomposed `core` field, if the promo exists there.
pub fn core_pattern(promo: PromoCode) -> Option<&'static Regex> {
    match promo {
        PromoCode::None | PromoCode::Sup => Some(&CORE_EMPTY),
        PromoCode::Disc => Some(&ARGS_DISC),
        PromoCode::DealFix => Some(&CORE_DEALFIX),
        PromoCode::Bxyg => Some(&ARGS_BXYG),
        PromoCode::DealPct | PromoCode::Pack => None,
    }
}

/// Grammar of the decomposed `cond` field.
pub fn cond_pattern() -> &'static Regex {
    &COND
}

/// Grammar of the decomposed `nth` field.
pub fn nth_pattern() -> &'static Regex {
    &NTH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(promo: PromoCode, table: &[(&str, bool)]) {
        let pattern = promo_args_pattern(promo);
        for (args, expected) in table {
            assert_eq!(
                pattern.is_match(args),
                *expected,
                "{} with promo_args {:?}",
                promo,
                args
            );
        }
    }

    #[test]
    fn test_none_and_sup() {
        check(PromoCode::None, &[("", true), ("0", false), ("1", false)]);
        check(PromoCode::Sup, &[("", true), ("1", true), ("24", true), ("0", false), ("01", false), ("1.5", false)]);
    }

    #[test]
    fn test_disc() {
        check(
            PromoCode::Disc,
            &[("0", true), ("7", true), ("40", true), ("100", true), ("101", false), ("-1", false), ("", false), ("40%", false), ("07", false)],
        );
    }

    #[test]
    fn test_dealpct() {
        check(
            PromoCode::DealPct,
            &[("3:27", true), ("2:40", true), ("2:100", true), ("0:40", false), ("2:101", false), ("2", false)],
        );
    }

    #[test]
    fn test_dealfix() {
        check(
            PromoCode::DealFix,
            &[("2=1.00", true), ("3=10.99", true), ("2=1.0", false), ("2=1.005", false), ("2=1", false), ("0=1.00", false), ("=1.00", false)],
        );
    }

    #[test]
    fn test_bxyg() {
        check(
            PromoCode::Bxyg,
            &[("1:1", true), ("4:2", true), ("0:1", false), ("1:0", false), ("1", false), ("1:1:1", false)],
        );
    }

    #[test]
    fn test_pack() {
        check(
            PromoCode::Pack,
            &[
                ("12", true),
                ("6:43", true),
                ("2x6", true),
                ("2x6:50", true),
                ("2x6|12", true),
                ("6:43|12", true),
                ("2x6|", false),
                ("|12", false),
                ("2x0", false),
                ("6:101", false),
                ("2X6", false),
            ],
        );
    }

    #[test]
    fn test_non_ascii_digits_rejected() {
        assert!(!promo_args_pattern(PromoCode::Disc).is_match("٤٠"));
    }

    #[test]
    fn test_decomposed_patterns() {
        assert!(core_pattern(PromoCode::DealFix).unwrap().is_match("1.99"));
        assert!(!core_pattern(PromoCode::DealFix).unwrap().is_match("1.9"));
        assert!(core_pattern(PromoCode::Pack).is_none());

        for ok in ["", "2", "2x3", "2x3|3x4"] {
            assert!(cond_pattern().is_match(ok), "{ok}");
        }
        for bad in ["0", "2x", "2|3", "2x3|"] {
            assert!(!cond_pattern().is_match(bad), "{bad}");
        }

        for ok in ["", "2", "9", "10", "12"] {
            assert!(nth_pattern().is_match(ok), "{ok}");
        }
        for bad in ["0", "1", "01"] {
            assert!(!nth_pattern().is_match(bad), "{bad}");
        }
    }
}
