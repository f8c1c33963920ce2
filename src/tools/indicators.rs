//! Technical indicators over daily closing prices

/// Simple moving average of the last `window` values.
pub fn sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Exponentially weighted mean with `alpha`, seeded with the first value and
/// no bias adjustment. Returns the last smoothed value.
fn ewm_last(values: impl Iterator<Item = f64>, alpha: f64) -> Option<f64> {
    values.fold(None, |acc, x| match acc {
        None => Some(x),
        Some(prev) => Some((1.0 - alpha) * prev + alpha * x),
    })
}

/// Relative Strength Index with Wilder smoothing (alpha = 1 / period).
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < 2 {
        return None;
    }

    let alpha = 1.0 / period as f64;
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let avg_gain = ewm_last(deltas.iter().map(|d| d.max(0.0)), alpha)?;
    let avg_loss = ewm_last(deltas.iter().map(|d| (-d).max(0.0)), alpha)?;

    if avg_loss == 0.0 {
        // No losses: RSI saturates (undefined when there was no movement at all).
        return if avg_gain == 0.0 { None } else { Some(100.0) };
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Unknown,
}

impl Trend {
    /// Price relative to its long-term average.
    pub fn from_price(price: f64, long_average: Option<f64>) -> Self {
        match long_average {
            Some(avg) if price > avg => Trend::Up,
            Some(_) => Trend::Down,
            None => Trend::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::Up => "UPTREND",
            Trend::Down => "DOWNTREND",
            Trend::Unknown => "UNKNOWN (less than 200 sessions)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_constant_series() {
        let values = vec![10.0; 60];
        assert_eq!(sma(&values, 50), Some(10.0));
    }

    #[test]
    fn test_sma_uses_tail() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(sma(&values, 2), Some(3.5));
        assert_eq!(sma(&values, 5), None);
    }

    #[test]
    fn test_rsi_rising_series_is_100() {
        let closes: Vec<f64> = (1..=30).map(f64::from).collect();
        assert_eq!(rsi(&closes, 14), Some(100.0));
    }

    #[test]
    fn test_rsi_falling_series_is_0() {
        let closes: Vec<f64> = (1..=30).rev().map(f64::from).collect();
        let value = rsi(&closes, 14).unwrap();
        assert!(value.abs() < 1e-9);
    }

    #[test]
    fn test_rsi_alternating_series_is_balanced() {
        let closes: Vec<f64> = (0..200)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let value = rsi(&closes, 14).unwrap();
        assert!((value - 50.0).abs() < 5.0, "rsi was {}", value);
    }

    #[test]
    fn test_rsi_flat_series_is_undefined() {
        assert_eq!(rsi(&[5.0; 20], 14), None);
    }

    #[test]
    fn test_trend() {
        assert_eq!(Trend::from_price(110.0, Some(100.0)), Trend::Up);
        assert_eq!(Trend::from_price(90.0, Some(100.0)), Trend::Down);
        assert_eq!(Trend::from_price(90.0, None), Trend::Unknown);
    }
}
