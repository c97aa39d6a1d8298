//! Summary statistics over a retained window of closes.

/// Min / max / mean close over a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summarize finite values; `None` when there are none.
pub fn summarize(values: &[f64]) -> Option<PriceSummary> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    Some(PriceSummary { min, max, mean })
}

/// Pad a `[min, max]` range by `fraction` of its width on both sides.
///
/// A flat range is widened by 1% of its level (or 1.0 at zero) so the
/// axis never collapses.
pub fn padded_range(min: f64, max: f64, fraction: f64) -> (f64, f64) {
    let width = max - min;
    if width.abs() < f64::EPSILON {
        let pad = if min.abs() > 0.0 { min.abs() * 0.01 } else { 1.0 };
        return (min - pad, max + pad);
    }
    (min - width * fraction, max + width * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_skips_non_finite() {
        let s = summarize(&[3.0, f64::NAN, 1.0, 2.0]).unwrap();
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert!((s.mean - 2.0).abs() < 1e-12);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn padded_range_never_collapses() {
        assert_eq!(padded_range(90.0, 110.0, 0.1), (88.0, 112.0));
        let (lo, hi) = padded_range(50.0, 50.0, 0.1);
        assert!(lo < 50.0 && hi > 50.0);
    }
}
