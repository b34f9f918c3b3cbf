//! Score normalization and risk tiers.

use std::fmt;

use serde::Serializer;

use crate::model::RiskPercentiles;

/// Divisor mapping the mean leaf sample count onto the percentile scale.
pub const SCORE_SCALE: f64 = 100.0;

/// Decimal places kept when a score is reported.
pub const SCORE_DECIMALS: usize = 3;

/// Three-way risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum RiskGroup {
    /// Score below the 25th percentile.
    Low,
    /// Score in `[p25, p75)`.
    Medium,
    /// Score at or above the 75th percentile.
    High,
}

impl RiskGroup {
    /// All tiers, lowest first.
    pub const ALL: [RiskGroup; 3] = [RiskGroup::Low, RiskGroup::Medium, RiskGroup::High];

    /// Return the tier name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RiskGroup::Low => "Low",
            RiskGroup::Medium => "Medium",
            RiskGroup::High => "High",
        }
    }
}

impl fmt::Display for RiskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scale a raw ensemble mean onto the percentile units.
#[must_use]
pub fn normalize(raw_score: f64) -> f64 {
    raw_score / SCORE_SCALE
}

/// Bucket a normalized score. Boundary values belong to the higher tier.
#[must_use]
pub fn classify(risk_score: f64, percentiles: &RiskPercentiles) -> RiskGroup {
    if risk_score < percentiles.p25 {
        RiskGroup::Low
    } else if risk_score < percentiles.p75 {
        RiskGroup::Medium
    } else {
        RiskGroup::High
    }
}

/// Round a score to [`SCORE_DECIMALS`] places.
///
/// Rounds the exact decimal expansion of `score`, so the result always agrees
/// with the [`Display`](fmt::Display) form of [`PredictionResult`].
#[must_use]
pub fn round_score(score: f64) -> f64 {
    format!("{score:.prec$}", prec = SCORE_DECIMALS)
        .parse()
        .unwrap_or(score)
}

fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_score(*score))
}

/// Outcome of one prediction.
///
/// Serializes as `{"riskScore": 0.2, "riskGroup": "Low"}` with the score
/// rounded to three decimals; [`Display`](fmt::Display) keeps trailing zeros.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// Normalized risk score at full precision.
    #[serde(serialize_with = "serialize_score")]
    pub risk_score: f64,
    /// Tier assigned from the percentile table.
    pub risk_group: RiskGroup,
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.prec$} ({})",
            self.risk_score,
            self.risk_group,
            prec = SCORE_DECIMALS
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuts() -> RiskPercentiles {
        RiskPercentiles::new(0.3, 0.6).unwrap()
    }

    #[test]
    fn normalize_divides_by_hundred() {
        assert!((normalize(20.0) - 0.2).abs() < 1e-12);
        assert!((normalize(0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn classify_interior_values() {
        assert_eq!(classify(0.1, &cuts()), RiskGroup::Low);
        assert_eq!(classify(0.45, &cuts()), RiskGroup::Medium);
        assert_eq!(classify(0.9, &cuts()), RiskGroup::High);
    }

    #[test]
    fn p25_boundary_is_medium() {
        assert_eq!(classify(0.3, &cuts()), RiskGroup::Medium);
    }

    #[test]
    fn p75_boundary_is_high() {
        assert_eq!(classify(0.6, &cuts()), RiskGroup::High);
    }

    #[test]
    fn collapsed_cuts_skip_medium() {
        let cuts = RiskPercentiles::new(0.4, 0.4).unwrap();
        assert_eq!(classify(0.39, &cuts), RiskGroup::Low);
        assert_eq!(classify(0.4, &cuts), RiskGroup::High);
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = PredictionResult {
            risk_score: 0.123_456,
            risk_group: RiskGroup::Medium,
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["riskGroup"], "Medium");
        assert!((json["riskScore"].as_f64().unwrap() - 0.123).abs() < 1e-12);
    }

    #[test]
    fn round_score_follows_decimal_expansion() {
        // 12345 / 100 / 100 is stored just below 1.2345.
        assert_eq!(round_score(normalize(12345.0 / 100.0)), 1.234);
        assert_eq!(round_score(normalize(2001.0 / 20.0)), 1.0);
        assert_eq!(round_score(0.2), 0.2);
    }

    #[test]
    fn serialized_score_matches_display() {
        for sum in [2001.0, 12345.0, 3337.0, 1115.0] {
            let result = PredictionResult {
                risk_score: normalize(sum / 100.0),
                risk_group: RiskGroup::High,
            };
            let json = serde_json::to_value(result).unwrap();
            let shown = format!("{:.3}", result.risk_score);
            assert_eq!(json["riskScore"].as_f64().unwrap(), shown.parse::<f64>().unwrap());
        }
    }

    #[test]
    fn result_display_keeps_three_decimals() {
        let result = PredictionResult {
            risk_score: 0.2,
            risk_group: RiskGroup::Low,
        };
        assert_eq!(result.to_string(), "0.200 (Low)");
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(RiskGroup::Low < RiskGroup::Medium);
        assert!(RiskGroup::Medium < RiskGroup::High);
        assert_eq!(RiskGroup::ALL.len(), 3);
    }
}
