use crate::calc::round_off_1_decimal;
use crate::scale::{GradingScale, CANONICAL_EPSILON};

/// Fixed pairing between canonical TRADITIONAL grades and POINTS.
///
/// "6+" and "6" both map to 0 points, so POINTS -> TRADITIONAL cannot recover
/// "6+": 0 points always converts back to 6.0.
pub const CONVERSION_TABLE: [(f64, i64); 17] = [
    (0.7, 15),
    (1.0, 14),
    (1.3, 13),
    (1.7, 12),
    (2.0, 11),
    (2.3, 10),
    (2.7, 9),
    (3.0, 8),
    (3.3, 7),
    (3.7, 6),
    (4.0, 5),
    (4.3, 4),
    (4.7, 3),
    (5.0, 2),
    (5.3, 1),
    (5.7, 0),
    (6.0, 0),
];

/// Converts a score between grading scales.
///
/// Canonical inputs use `CONVERSION_TABLE`; everything else is clamped to the
/// source range and interpolated linearly.
pub fn convert(value: f64, from: GradingScale, to: GradingScale) -> f64 {
    if from == to {
        return value;
    }

    let exact = match (from, to) {
        (GradingScale::Traditional, GradingScale::Points) => traditional_to_points_exact(value),
        (GradingScale::Points, GradingScale::Traditional) => points_to_traditional_exact(value),
        _ => None,
    };
    exact.unwrap_or_else(|| interpolate(value, from, to))
}

fn traditional_to_points_exact(value: f64) -> Option<f64> {
    CONVERSION_TABLE
        .iter()
        .find(|(trad, _)| (trad - value).abs() < CANONICAL_EPSILON)
        .map(|(_, points)| *points as f64)
}

fn points_to_traditional_exact(value: f64) -> Option<f64> {
    if value.fract() != 0.0 || !GradingScale::Points.is_valid(value) {
        return None;
    }
    let points = value as i64;
    // Last match wins so that 0 resolves to "6", not "6+".
    CONVERSION_TABLE
        .iter()
        .rev()
        .find(|(_, p)| *p == points)
        .map(|(trad, _)| *trad)
}

/// Position of `value` on `scale` as a 0..=1 quality fraction, 1 being best.
fn quality_fraction(value: f64, scale: GradingScale) -> f64 {
    let span = scale.max() - scale.min();
    let clamped = scale.clamp(value);
    if scale.is_lower_better() {
        (scale.max() - clamped) / span
    } else {
        (clamped - scale.min()) / span
    }
}

fn interpolate(value: f64, from: GradingScale, to: GradingScale) -> f64 {
    let quality = quality_fraction(value, from);
    let span = to.max() - to.min();
    let mapped = if to.is_lower_better() {
        to.max() - quality * span
    } else {
        to.min() + quality * span
    };

    let rounded = match to {
        GradingScale::Points => mapped.round(),
        GradingScale::Traditional => round_off_1_decimal(mapped),
    };
    to.clamp(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::GradingScale::{Points, Traditional};

    #[test]
    fn identity_is_exact() {
        for v in [0.7, 2.35, 5.999, 6.0] {
            assert_eq!(convert(v, Traditional, Traditional), v);
        }
        for v in [0.0, 7.5, 15.0] {
            assert_eq!(convert(v, Points, Points), v);
        }
    }

    #[test]
    fn canonical_forward_matches_table() {
        assert_eq!(convert(0.7, Traditional, Points), 15.0);
        assert_eq!(convert(4.0, Traditional, Points), 5.0);
        for (trad, points) in CONVERSION_TABLE {
            assert_eq!(convert(trad, Traditional, Points), points as f64);
        }
    }

    #[test]
    fn canonical_reverse_matches_table() {
        assert_eq!(convert(15.0, Points, Traditional), 0.7);
        assert_eq!(convert(11.0, Points, Traditional), 2.0);
        assert_eq!(convert(1.0, Points, Traditional), 5.3);
        assert_eq!(convert(0.0, Points, Traditional), 6.0);
    }

    #[test]
    fn six_plus_is_lost_on_round_trip() {
        let six = convert(convert(6.0, Traditional, Points), Points, Traditional);
        assert_eq!(six, 6.0);
        let six_plus = convert(convert(5.7, Traditional, Points), Points, Traditional);
        assert_eq!(six_plus, 6.0);
        assert_ne!(six_plus, 5.7);
    }

    #[test]
    fn out_of_range_is_clamped_before_mapping() {
        assert_eq!(convert(7.0, Traditional, Points), 0.0);
        assert_eq!(convert(0.1, Traditional, Points), 15.0);
        assert_eq!(convert(20.0, Points, Traditional), 0.7);
        assert_eq!(convert(-3.0, Points, Traditional), 6.0);
    }

    #[test]
    fn intermediate_values_interpolate() {
        // (6.0 - 3.35) / 5.3 = 0.5 -> 7.5 -> 8
        assert_eq!(convert(3.35, Traditional, Points), 8.0);
        // 7.5 points is halfway: 6.0 - 0.5 * 5.3 = 3.35 -> 3.4
        let mid = convert(7.5, Points, Traditional);
        assert!((mid - 3.4).abs() < 1e-9, "got {mid}");
    }

    #[test]
    fn interpolated_traditional_stays_in_range() {
        let mut v = 0.0;
        while v <= 15.0 {
            let out = convert(v + 0.25, Points, Traditional);
            assert!(Traditional.is_valid(out), "{v} -> {out}");
            v += 0.5;
        }
    }
}
