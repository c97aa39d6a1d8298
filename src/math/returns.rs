//! Lookback and year-to-date returns.
//!
//! For a close series `p` and a lookback `k`, the return at position `i` is:
//!
//! ```text
//! r_k[i] = (p[i] - p[i-k]) / p[i-k] * 100      for i >= k
//! ```
//!
//! Lookbacks count trading observations, not calendar days:
//! daily = 1, weekly = 5, monthly = 21, year-over-year = 252.
//!
//! The year-to-date return is referenced against the first observation of the
//! same calendar year, so it is `0` on that observation.

use chrono::Datelike;

use crate::domain::{PriceSeries, ReturnRow, ReturnSeries};

pub const DAILY_LOOKBACK: usize = 1;
pub const WEEKLY_LOOKBACK: usize = 5;
pub const MONTHLY_LOOKBACK: usize = 21;
pub const YEARLY_LOOKBACK: usize = 252;

/// Percentage change from `base` to `value`; `None` when the base is zero.
pub fn pct_change(base: f64, value: f64) -> Option<f64> {
    if base == 0.0 {
        return None;
    }
    let pct = (value - base) / base * 100.0;
    pct.is_finite().then_some(pct)
}

/// `k`-step returns for every position; undefined for `i < k`.
pub fn lookback_returns(closes: &[f64], k: usize) -> Vec<Option<f64>> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            if k == 0 || i < k {
                None
            } else {
                pct_change(closes[i - k], p)
            }
        })
        .collect()
}

/// Year-to-date returns, keyed on each observation's calendar year.
pub fn ytd_returns(series: &PriceSeries) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(series.len());
    let mut base: Option<(i32, f64)> = None;

    for point in series.points() {
        let year = point.date.year();
        let base_close = match base {
            Some((y, close)) if y == year => close,
            _ => {
                base = Some((year, point.close));
                point.close
            }
        };
        out.push(pct_change(base_close, point.close));
    }

    out
}

/// Compute the full return table for a validated series.
pub fn compute_returns(series: &PriceSeries) -> ReturnSeries {
    let closes: Vec<f64> = series.points().iter().map(|p| p.close).collect();

    let daily = lookback_returns(&closes, DAILY_LOOKBACK);
    let weekly = lookback_returns(&closes, WEEKLY_LOOKBACK);
    let monthly = lookback_returns(&closes, MONTHLY_LOOKBACK);
    let yoy = lookback_returns(&closes, YEARLY_LOOKBACK);
    let ytd = ytd_returns(series);

    let rows = series
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| ReturnRow {
            date: p.date,
            close: p.close,
            daily: daily[i],
            weekly: weekly[i],
            monthly: monthly[i],
            yoy: yoy[i],
            ytd: ytd[i],
        })
        .collect();

    ReturnSeries {
        instrument: series.instrument().clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    use crate::domain::{Instrument, PricePoint};

    fn series_from(start: NaiveDate, closes: &[f64]) -> PriceSeries {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                close,
            })
            .collect();
        PriceSeries::new(Instrument::from_symbol("CL=F"), points).unwrap()
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|v| (v - b).abs() < 0.005).unwrap_or(false)
    }

    #[test]
    fn daily_returns_match_worked_example() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let returns = compute_returns(&series_from(start, &[100.0, 102.0, 98.0, 105.0, 110.0]));
        let daily: Vec<Option<f64>> = returns.rows.iter().map(|r| r.daily).collect();

        assert_eq!(daily[0], None);
        assert!(approx(daily[1], 2.0));
        assert!(approx(daily[2], -3.92));
        assert!(approx(daily[3], 7.14));
        assert!(approx(daily[4], 4.76));
    }

    #[test]
    fn lookbacks_are_undefined_before_k() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        for k in [1, 5, 21, 252] {
            let r = lookback_returns(&closes, k);
            for (i, v) in r.iter().enumerate() {
                if i < k {
                    assert!(v.is_none(), "k={k} i={i} should be undefined");
                } else {
                    let expected = (closes[i] - closes[i - k]) / closes[i - k] * 100.0;
                    assert!((v.unwrap() - expected).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn short_series_still_has_short_windows() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + i as f64).collect();
        let returns = compute_returns(&series_from(start, &closes));
        let last = returns.rows.last().unwrap();
        assert!(last.daily.is_some());
        assert!(last.weekly.is_some());
        assert!(last.monthly.is_some());
        assert!(last.yoy.is_none());
    }

    #[test]
    fn zero_reference_price_is_undefined() {
        let r = lookback_returns(&[0.0, 5.0, 10.0], 1);
        assert_eq!(r[1], None);
        assert!(approx(r[2], 100.0));
    }

    #[test]
    fn ytd_resets_on_each_new_year() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        // 2024-12-30, 2024-12-31, 2025-01-01, 2025-01-02
        let returns = compute_returns(&series_from(start, &[80.0, 88.0, 100.0, 110.0]));
        let ytd: Vec<Option<f64>> = returns.rows.iter().map(|r| r.ytd).collect();

        assert!(approx(ytd[0], 0.0));
        assert!(approx(ytd[1], 10.0));
        assert!(approx(ytd[2], 0.0));
        assert!(approx(ytd[3], 10.0));
    }

    #[test]
    fn ytd_with_zero_base_is_undefined() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let returns = compute_returns(&series_from(start, &[0.0, 1.0]));
        assert_eq!(returns.rows[0].ytd, None);
        assert_eq!(returns.rows[1].ytd, None);
    }
}
