//! Annual tariff projection from historical tariff points.
//!
//! With enough history an ordinary least-squares line is fitted over the
//! *index positions* of the chronologically sorted points (not calendar
//! time) and extrapolated in 12-index steps past the last observation.
//! Short or empty histories fall back to compounding a starting tariff at a
//! fixed annual growth rate.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ProposalError;
use crate::time_value::growth_factor;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ProposalResult;

/// Annual growth applied when the history is too short to regress.
pub const DEFAULT_TARIFF_GROWTH: Rate = dec!(0.08);
/// Starting tariff (R$/kWh) when none is supplied.
pub const DEFAULT_TARIFF: Money = dec!(0.80);
/// Fewer usable points than this forces the growth fallback.
pub const MIN_REGRESSION_POINTS: usize = 6;
/// Longest analysis horizon accepted by report-level entry points.
pub const MAX_HORIZON_YEARS: u32 = 100;

const INDEX_STEP_PER_YEAR: i64 = 12;

/// One observed tariff from the distributor's published history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffPoint {
    pub year: i32,
    pub month: u32,
    pub tariff: Money,
}

impl TariffPoint {
    /// First day of the observed month, `None` when year/month is not a date.
    pub fn period(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

/// Tunables for the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    pub fallback_growth: Rate,
    pub default_tariff: Money,
    pub min_regression_points: usize,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            fallback_growth: DEFAULT_TARIFF_GROWTH,
            default_tariff: DEFAULT_TARIFF,
            min_regression_points: MIN_REGRESSION_POINTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionMethod {
    Regression,
    FallbackGrowth,
}

/// `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: Decimal,
    pub intercept: Decimal,
}

impl LinearFit {
    pub fn at(&self, x: Decimal) -> Option<Decimal> {
        self.slope.checked_mul(x)?.checked_add(self.intercept)
    }
}

/// Projected tariff per analysis year (index 0 = year 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffProjection {
    pub method: ProjectionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<LinearFit>,
    pub points_used: usize,
    pub tariffs: Vec<Money>,
}

/// Request for the standalone projection report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffProjectionInput {
    #[serde(default)]
    pub history: Vec<TariffPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_tariff: Option<Money>,
    pub horizon_years: u32,
    #[serde(default)]
    pub settings: ProjectionSettings,
}

/// Ordinary least squares over x = 0, 1, 2, ...
///
/// `None` for fewer than two values or when an intermediate overflows.
pub fn fit_linear(values: &[Decimal]) -> Option<LinearFit> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let n_dec = Decimal::from(n as u64);

    let mut sum_x = Decimal::ZERO;
    let mut sum_y = Decimal::ZERO;
    let mut sum_xy = Decimal::ZERO;
    let mut sum_xx = Decimal::ZERO;
    for (i, y) in values.iter().enumerate() {
        let x = Decimal::from(i as u64);
        sum_x += x;
        sum_y = sum_y.checked_add(*y)?;
        sum_xy = sum_xy.checked_add(x.checked_mul(*y)?)?;
        sum_xx += x * x;
    }

    let denominator = n_dec * sum_xx - sum_x * sum_x;
    if denominator.is_zero() {
        return None;
    }
    let slope = (n_dec.checked_mul(sum_xy)?.checked_sub(sum_x.checked_mul(sum_y)?)?)
        .checked_div(denominator)?;
    let intercept = (sum_y.checked_sub(slope.checked_mul(sum_x)?)?).checked_div(n_dec)?;

    Some(LinearFit { slope, intercept })
}

/// Drop points that are not valid calendar months and sort the rest
/// chronologically. Returns the usable points and how many were dropped.
pub fn usable_history(history: &[TariffPoint]) -> (Vec<TariffPoint>, usize) {
    let mut dated: Vec<(NaiveDate, TariffPoint)> = history
        .iter()
        .filter_map(|p| p.period().map(|d| (d, p.clone())))
        .collect();
    let dropped = history.len() - dated.len();
    dated.sort_by_key(|(d, _)| *d);
    (dated.into_iter().map(|(_, p)| p).collect(), dropped)
}

/// Compound `start` at `growth` for `years` years; year 1 is `start` itself.
pub fn fallback_growth_series(start: Money, growth: Rate, years: u32) -> Vec<Money> {
    (0..years)
        .map(|y| {
            growth_factor(growth, y)
                .and_then(|f| start.checked_mul(f))
                .unwrap_or(Decimal::ZERO)
        })
        .collect()
}

/// Project one tariff per analysis year.
pub fn project_tariffs(
    history: &[TariffPoint],
    initial_tariff: Option<Money>,
    horizon_years: u32,
    settings: &ProjectionSettings,
) -> TariffProjection {
    let default_tariff = match initial_tariff {
        Some(t) if t > Decimal::ZERO => t,
        _ => settings.default_tariff,
    };

    let (points, dropped) = usable_history(history);
    if dropped > 0 {
        log::warn!("tariff projection: dropped {dropped} history points with invalid year/month");
    }

    let fit = if points.len() >= settings.min_regression_points {
        let values: Vec<Decimal> = points.iter().map(|p| p.tariff).collect();
        fit_linear(&values)
    } else {
        None
    };

    match fit {
        Some(fit) => {
            let last_index = points.len() as i64 - 1;
            let tariffs = (1..=i64::from(horizon_years))
                .map(|year| {
                    let x = Decimal::from(last_index + INDEX_STEP_PER_YEAR * year);
                    match fit.at(x) {
                        Some(v) if v > Decimal::ZERO => v,
                        _ => default_tariff,
                    }
                })
                .collect();
            TariffProjection {
                method: ProjectionMethod::Regression,
                fit: Some(fit),
                points_used: points.len(),
                tariffs,
            }
        }
        None => {
            log::debug!(
                "tariff projection: {} usable points, falling back to {} annual growth",
                points.len(),
                settings.fallback_growth
            );
            TariffProjection {
                method: ProjectionMethod::FallbackGrowth,
                fit: None,
                points_used: points.len(),
                tariffs: fallback_growth_series(
                    default_tariff,
                    settings.fallback_growth,
                    horizon_years,
                ),
            }
        }
    }
}

/// Projection wrapped in the standard output envelope.
pub fn tariff_projection_report(
    input: &TariffProjectionInput,
) -> ProposalResult<ComputationOutput<TariffProjection>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.horizon_years > MAX_HORIZON_YEARS {
        return Err(ProposalError::InvalidInput {
            field: "horizon_years".into(),
            reason: format!("Analysis horizon must not exceed {MAX_HORIZON_YEARS} years"),
        });
    }

    let (_, dropped) = usable_history(&input.history);
    if dropped > 0 {
        warnings.push(format!(
            "{dropped} history points with an invalid year/month were ignored"
        ));
    }

    let projection = project_tariffs(
        &input.history,
        input.initial_tariff,
        input.horizon_years,
        &input.settings,
    );
    if projection.method == ProjectionMethod::FallbackGrowth {
        warnings.push(format!(
            "Only {} usable history points; projected with {} annual growth",
            projection.points_used, input.settings.fallback_growth
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Index-based OLS tariff projection",
        input,
        warnings,
        elapsed,
        projection,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn point(year: i32, month: u32, tariff: Decimal) -> TariffPoint {
        TariffPoint { year, month, tariff }
    }

    #[test]
    fn test_fit_exact_line() {
        let fit = fit_linear(&[dec!(1), dec!(3), dec!(5), dec!(7)]).unwrap();
        assert_eq!(fit.slope, dec!(2));
        assert_eq!(fit.intercept, dec!(1));
    }

    #[test]
    fn test_fit_needs_two_points() {
        assert!(fit_linear(&[dec!(1)]).is_none());
        assert!(fit_linear(&[]).is_none());
    }

    #[test]
    fn test_short_history_falls_back() {
        let history = vec![point(2023, 1, dec!(0.7)), point(2024, 1, dec!(0.75))];
        let p = project_tariffs(&history, Some(dec!(1)), 3, &ProjectionSettings::default());
        assert_eq!(p.method, ProjectionMethod::FallbackGrowth);
        assert_eq!(p.tariffs, vec![dec!(1), dec!(1.08), dec!(1.1664)]);
    }

    #[test]
    fn test_fallback_uses_default_tariff_without_initial() {
        let p = project_tariffs(&[], None, 1, &ProjectionSettings::default());
        assert_eq!(p.tariffs, vec![DEFAULT_TARIFF]);
    }

    #[test]
    fn test_unrepresentable_growth_is_zero() {
        assert_eq!(
            fallback_growth_series(dec!(0.8), Decimal::MAX, 3),
            vec![dec!(0.8), Decimal::ZERO, Decimal::ZERO]
        );
    }

    #[test]
    fn test_regression_sorts_and_extrapolates() {
        // Unsorted input; sorted values are 0.50, 0.51, ..., 0.55 (slope 0.01)
        let history = vec![
            point(2024, 3, dec!(0.53)),
            point(2023, 10, dec!(0.50)),
            point(2024, 1, dec!(0.52)),
            point(2024, 6, dec!(0.55)),
            point(2023, 12, dec!(0.51)),
            point(2024, 4, dec!(0.54)),
        ];
        let p = project_tariffs(&history, None, 2, &ProjectionSettings::default());
        assert_eq!(p.method, ProjectionMethod::Regression);
        let fit = p.fit.unwrap();
        assert_eq!(fit.slope, dec!(0.01));
        assert_eq!(fit.intercept, dec!(0.50));
        // last index 5: year 1 → x = 17, year 2 → x = 29
        assert_eq!(p.tariffs, vec![dec!(0.67), dec!(0.79)]);
    }

    #[test]
    fn test_regression_non_positive_falls_back_per_point() {
        let history: Vec<TariffPoint> = (0..6)
            .map(|i| point(2020 + i, 1, dec!(1) - Decimal::from(i) * dec!(0.1)))
            .collect();
        let p = project_tariffs(&history, Some(dec!(0.9)), 2, &ProjectionSettings::default());
        assert_eq!(p.method, ProjectionMethod::Regression);
        assert_eq!(p.tariffs, vec![dec!(0.9), dec!(0.9)]);
    }

    #[test]
    fn test_invalid_months_dropped() {
        let history = vec![point(2024, 0, dec!(1)), point(2024, 13, dec!(1)), point(2024, 2, dec!(1))];
        let (usable, dropped) = usable_history(&history);
        assert_eq!(usable.len(), 1);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_report_rejects_huge_horizon() {
        let input = TariffProjectionInput {
            history: vec![],
            initial_tariff: None,
            horizon_years: MAX_HORIZON_YEARS + 1,
            settings: ProjectionSettings::default(),
        };
        assert!(tariff_projection_report(&input).is_err());
    }

    #[test]
    fn test_report_warns_on_fallback() {
        let input = TariffProjectionInput {
            history: vec![],
            initial_tariff: Some(dec!(0.9)),
            horizon_years: 5,
            settings: ProjectionSettings::default(),
        };
        let out = tariff_projection_report(&input).unwrap();
        assert_eq!(out.result.tariffs.len(), 5);
        assert_eq!(out.warnings.len(), 1);
    }
}
