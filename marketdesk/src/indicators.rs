/// Rolling indicators over the merged close-price series
///
/// Pure functions of (series, period); the view recomputes them on every
/// series mutation. A running window sum keeps recomputation O(n).

/// Simple moving average of `closes` with the given period.
///
/// Output has the same length as the input; position `i` is `None` until
/// `period` closes are available (`i < period - 1`), then the arithmetic
/// mean of `closes[i - period + 1..=i]`.
pub fn rolling_average(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let mut out = Vec::with_capacity(closes.len());
    let mut window_sum = 0.0;
    for (i, close) in closes.iter().enumerate() {
        window_sum += close;
        if i >= period {
            window_sum -= closes[i - period];
        }
        if i + 1 >= period {
            out.push(Some(window_sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// One SMA overlay, ready for whatever renders the chart
#[derive(Debug, Clone, PartialEq)]
pub struct SmaOverlay {
    pub period: usize,
    pub values: Vec<Option<f64>>,
}

/// Compute one overlay per configured period. Periods are independent
/// invocations over the same closes.
pub fn sma_overlays(closes: &[f64], periods: &[usize]) -> Vec<SmaOverlay> {
    periods
        .iter()
        .map(|&period| SmaOverlay {
            period,
            values: rolling_average(closes, period),
        })
        .collect()
}
