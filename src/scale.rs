use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tolerance used when deciding whether a stored value sits on a canonical grade.
/// Values round-trip through SQLite REAL unchanged, so this only absorbs
/// literal-vs-computed noise such as `0.1 * 13`.
pub const CANONICAL_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradingScale {
    /// 0.7..=6.0, lower is better.
    #[default]
    Traditional,
    /// 0..=15, higher is better.
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanonicalGrade {
    pub value: f64,
    pub label: &'static str,
}

const fn grade(value: f64, label: &'static str) -> CanonicalGrade {
    CanonicalGrade { value, label }
}

static TRADITIONAL_GRADES: [CanonicalGrade; 17] = [
    grade(0.7, "1+"),
    grade(1.0, "1"),
    grade(1.3, "1-"),
    grade(1.7, "2+"),
    grade(2.0, "2"),
    grade(2.3, "2-"),
    grade(2.7, "3+"),
    grade(3.0, "3"),
    grade(3.3, "3-"),
    grade(3.7, "4+"),
    grade(4.0, "4"),
    grade(4.3, "4-"),
    grade(4.7, "5+"),
    grade(5.0, "5"),
    grade(5.3, "5-"),
    grade(5.7, "6+"),
    grade(6.0, "6"),
];

static POINTS_GRADES: [CanonicalGrade; 16] = [
    grade(0.0, "0 P"),
    grade(1.0, "1 P"),
    grade(2.0, "2 P"),
    grade(3.0, "3 P"),
    grade(4.0, "4 P"),
    grade(5.0, "5 P"),
    grade(6.0, "6 P"),
    grade(7.0, "7 P"),
    grade(8.0, "8 P"),
    grade(9.0, "9 P"),
    grade(10.0, "10 P"),
    grade(11.0, "11 P"),
    grade(12.0, "12 P"),
    grade(13.0, "13 P"),
    grade(14.0, "14 P"),
    grade(15.0, "15 P"),
];

impl GradingScale {
    pub const ALL: [GradingScale; 2] = [GradingScale::Traditional, GradingScale::Points];

    pub fn min(self) -> f64 {
        match self {
            GradingScale::Traditional => 0.7,
            GradingScale::Points => 0.0,
        }
    }

    pub fn max(self) -> f64 {
        match self {
            GradingScale::Traditional => 6.0,
            GradingScale::Points => 15.0,
        }
    }

    pub fn is_lower_better(self) -> bool {
        matches!(self, GradingScale::Traditional)
    }

    /// Ascending by numeric value.
    pub fn canonical_values(self) -> &'static [CanonicalGrade] {
        match self {
            GradingScale::Traditional => &TRADITIONAL_GRADES,
            GradingScale::Points => &POINTS_GRADES,
        }
    }

    pub fn is_valid(self, value: f64) -> bool {
        value >= self.min() && value <= self.max()
    }

    pub fn clamp(self, value: f64) -> f64 {
        value.clamp(self.min(), self.max())
    }

    pub fn canonical_index(self, value: f64) -> Option<usize> {
        self.canonical_values()
            .iter()
            .position(|g| (g.value - value).abs() < CANONICAL_EPSILON)
    }

    pub fn label_for(self, value: f64) -> Option<&'static str> {
        self.canonical_index(value)
            .map(|i| self.canonical_values()[i].label)
    }

    /// Human-readable rendering for any value on this scale.
    pub fn format(self, value: f64) -> String {
        if let Some(label) = self.label_for(value) {
            return label.to_string();
        }
        match self {
            GradingScale::Traditional => format!("{:.1}", value),
            GradingScale::Points => format!("{} P", value.round() as i64),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GradingScale::Traditional => "traditional",
            GradingScale::Points => "points",
        }
    }
}

impl fmt::Display for GradingScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown grading scale: {0}")]
pub struct UnknownScale(pub String);

impl FromStr for GradingScale {
    type Err = UnknownScale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "traditional" => Ok(GradingScale::Traditional),
            "points" => Ok(GradingScale::Points),
            _ => Err(UnknownScale(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_and_direction() {
        assert_eq!(GradingScale::Traditional.min(), 0.7);
        assert_eq!(GradingScale::Traditional.max(), 6.0);
        assert!(GradingScale::Traditional.is_lower_better());
        assert_eq!(GradingScale::Points.min(), 0.0);
        assert_eq!(GradingScale::Points.max(), 15.0);
        assert!(!GradingScale::Points.is_lower_better());
    }

    #[test]
    fn canonical_tables_have_expected_shape() {
        let trad = GradingScale::Traditional.canonical_values();
        assert_eq!(trad.len(), 17);
        assert_eq!(trad[0].label, "1+");
        assert_eq!(trad[16].value, 6.0);
        assert!(trad.windows(2).all(|w| w[0].value < w[1].value));

        let points = GradingScale::Points.canonical_values();
        assert_eq!(points.len(), 16);
        assert_eq!(points[12].label, "12 P");
    }

    #[test]
    fn validity_is_inclusive() {
        assert!(GradingScale::Traditional.is_valid(0.7));
        assert!(GradingScale::Traditional.is_valid(6.0));
        assert!(!GradingScale::Traditional.is_valid(0.5));
        assert!(!GradingScale::Traditional.is_valid(6.1));
        assert!(GradingScale::Points.is_valid(0.0));
        assert!(!GradingScale::Points.is_valid(15.5));
    }

    #[test]
    fn format_prefers_labels() {
        assert_eq!(GradingScale::Traditional.format(2.3), "2-");
        assert_eq!(GradingScale::Traditional.format(2.44), "2.4");
        assert_eq!(GradingScale::Points.format(11.0), "11 P");
        assert_eq!(GradingScale::Points.format(10.6), "11 P");
    }

    #[test]
    fn parses_identifiers() {
        assert_eq!("POINTS".parse::<GradingScale>(), Ok(GradingScale::Points));
        assert_eq!(
            " traditional ".parse::<GradingScale>(),
            Ok(GradingScale::Traditional)
        );
        assert!("percent".parse::<GradingScale>().is_err());
    }
}
