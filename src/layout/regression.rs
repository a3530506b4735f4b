//! Root-to-tip regression of divergence against sampling date.

use color_eyre::eyre::Result;
use serde::Serialize;

use super::DistanceMeasure;
use super::distance::measure_value;
use crate::tree::TreeArena;

/// A fitted line `div = slope * num_date + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, free-intercept fits only.
    pub r2: Option<f64>,
}

impl Regression {
    /// Value of the line at `x`.
    #[inline]
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Rate label drawn next to the clock regression line.
    ///
    /// `y_max` is the top of the divergence domain; trees whose divergence
    /// stays at or below 5 are taken to be measured in substitutions per site.
    pub fn rate_text(&self, y_max: f64) -> String {
        if y_max <= PER_SITE_MAX_DIVERGENCE {
            format!(
                "rate estimate: {} subs per site per year",
                to_exponential(self.slope, 2)
            )
        } else {
            format!(
                "rate estimate: {} subs per year",
                format_divergence(self.slope)
            )
        }
    }

    /// Summary of a free-intercept fit to three significant digits.
    pub fn fit_text(&self) -> String {
        let r2 = self
            .r2
            .map_or_else(|| "n/a".to_string(), |r2| to_precision(r2, 3));
        format!(
            "intercept = {}, slope = {}, R^2 = {}",
            to_precision(self.intercept, 3),
            to_precision(self.slope, 3),
            r2
        )
    }
}

/// Largest divergence still read as substitutions per site.
const PER_SITE_MAX_DIVERGENCE: f64 = 5.0;

/// Divergence rounded to 3 decimals above 1, 4 decimals above 0.01, else
/// exponential with 3 fraction digits.
fn format_divergence(value: f64) -> String {
    if value > 1.0 {
        format!("{}", (value * 1e3).round() / 1e3)
    } else if value > 0.01 {
        format!("{}", (value * 1e4).round() / 1e4)
    } else {
        to_exponential(value, 3)
    }
}

/// `d.ddde±x` notation with an explicit exponent sign.
fn to_exponential(value: f64, fraction_digits: usize) -> String {
    let formatted = format!("{value:.fraction_digits$e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}

/// `digits` significant digits, switching to exponential notation for very
/// small or large magnitudes.
fn to_precision(value: f64, digits: usize) -> String {
    let fraction_digits = digits.saturating_sub(1);
    if value == 0.0 || !value.is_finite() {
        return format!("{value:.fraction_digits$}");
    }
    let scientific = format!("{value:.fraction_digits$e}");
    let exponent = scientific
        .split_once('e')
        .and_then(|(_, e)| e.parse::<i32>().ok())
        .unwrap_or(0);
    if exponent < -6 || exponent >= digits as i32 {
        to_exponential(value, fraction_digits)
    } else {
        let decimals = (fraction_digits as i32 - exponent).max(0) as usize;
        format!("{value:.decimals$}")
    }
}

/// `(num_date, div)` of every tip.
fn tip_points(arena: &TreeArena) -> Result<Vec<(f64, f64)>> {
    arena
        .nodes()
        .iter()
        .filter(|n| n.is_terminal())
        .map(|n| {
            Ok((
                measure_value(n, DistanceMeasure::NumDate)?,
                measure_value(n, DistanceMeasure::Div)?,
            ))
        })
        .collect()
}

/// Least squares fit through the root's own `(num_date, div)`.
///
/// The intercept is pinned so the line passes through the root date at zero
/// divergence; the slope is the substitution rate since the root. All tips
/// are used regardless of zoom. A zero second moment gives slope 0.
pub fn through_root(arena: &TreeArena) -> Result<Regression> {
    let offset = measure_value(&arena[arena.root()], DistanceMeasure::NumDate)?;
    let points = tip_points(arena)?;

    let (xy, second_moment) = points.iter().fold((0.0, 0.0), |(xy, xx), &(date, div)| {
        let dt = date - offset;
        (xy + div * dt, xx + dt * dt)
    });
    let slope = if second_moment > 0.0 {
        xy / second_moment
    } else {
        0.0
    };

    Ok(Regression {
        slope,
        intercept: -offset * slope,
        r2: None,
    })
}

/// Ordinary least squares over the tips, with `r²`.
pub fn free_intercept(arena: &TreeArena) -> Result<Regression> {
    let points = tip_points(arena)?;
    if points.is_empty() {
        return Ok(Regression {
            slope: 0.0,
            intercept: 0.0,
            r2: None,
        });
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - (intercept + slope * p.0)).powi(2))
        .sum();
    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let r2 = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);

    Ok(Regression {
        slope,
        intercept,
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{TreeNode, test_trees};

    #[test]
    fn test_clocklike_tree_recovers_rate() {
        let arena = TreeArena::from_tree(&test_trees::clocklike(0.003)).unwrap();
        let fit = through_root(&arena).unwrap();

        assert!((fit.slope - 0.003).abs() < 1e-12);
        assert!((fit.intercept - (-2000.0 * 0.003)).abs() < 1e-9);
        assert!(fit.r2.is_none());
        assert!(fit.at(2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_second_moment_gives_flat_line() {
        let tree = TreeNode::new("root", 0.5)
            .with_trait("div", 0.0)
            .with_trait("num_date", 2010.0)
            .with_children(vec![
                TreeNode::new("a", 0.0)
                    .with_trait("div", 0.1)
                    .with_trait("num_date", 2010.0),
                TreeNode::new("b", 1.0)
                    .with_trait("div", 0.2)
                    .with_trait("num_date", 2010.0),
            ]);
        let arena = TreeArena::from_tree(&tree).unwrap();
        let fit = through_root(&arena).unwrap();

        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 0.0);
    }

    #[test]
    fn test_free_intercept_perfect_fit() {
        let arena = TreeArena::from_tree(&test_trees::clocklike(0.5)).unwrap();
        let fit = free_intercept(&arena).unwrap();

        assert!((fit.slope - 0.5).abs() < 1e-9);
        assert!((fit.r2.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_date_is_error() {
        let tree = TreeNode::new("root", 0.0).with_trait("div", 0.0);
        let arena = TreeArena::from_tree(&tree).unwrap();
        assert!(through_root(&arena).is_err());
    }

    #[test]
    fn test_rate_text_per_site() {
        let fit = Regression {
            slope: 0.002,
            intercept: 0.0,
            r2: None,
        };

        assert_eq!(fit.rate_text(0.05), "rate estimate: 2.00e-3 subs per site per year");
        assert_eq!(fit.rate_text(5.0), "rate estimate: 2.00e-3 subs per site per year");
    }

    #[test]
    fn test_rate_text_per_genome() {
        let rate = |slope| Regression {
            slope,
            intercept: 0.0,
            r2: None,
        };

        assert_eq!(rate(24.12345).rate_text(80.0), "rate estimate: 24.123 subs per year");
        assert_eq!(rate(0.123456).rate_text(80.0), "rate estimate: 0.1235 subs per year");
        assert_eq!(rate(0.002).rate_text(80.0), "rate estimate: 2.000e-3 subs per year");
    }

    #[test]
    fn test_fit_text() {
        let fit = Regression {
            slope: 0.0012345,
            intercept: -2.4681,
            r2: Some(0.98765),
        };

        assert_eq!(
            fit.fit_text(),
            "intercept = -2.47, slope = 0.00123, R^2 = 0.988"
        );
        assert_eq!(to_precision(123456.0, 3), "1.23e+5");
        assert_eq!(to_precision(0.0, 3), "0.00");
    }
}
