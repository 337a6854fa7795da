//! Deriving the external signals from trade volume
//!
//! Each family follows one volume source. Buy-heavy volume speeds its
//! family up, and heavy selling on either source arms the Stable spawn.

use serde::{Deserialize, Serialize};

/// Combined volume above which the delta is damped the most
const HIGH_VOLUME: f64 = 1000.0;
/// Combined volume above which the delta is used as-is
const MEDIUM_VOLUME: f64 = 100.0;
/// Share of the combined volume one source's sells must reach
const SELL_PRESSURE_SHARE: f64 = 0.5;

/// Latest buy/sell volume of one source (missing readings count as zero)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeSample {
    pub buy: Option<f64>,
    pub sell: Option<f64>,
}

impl VolumeSample {
    pub fn new(buy: f64, sell: f64) -> Self {
        Self {
            buy: Some(buy),
            sell: Some(sell),
        }
    }

    fn buy_or_zero(&self) -> f64 {
        self.buy.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    fn sell_or_zero(&self) -> f64 {
        self.sell.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.buy_or_zero() + self.sell_or_zero()
    }

    /// Family speed multiplier, never below 1.0
    ///
    /// The buy/sell imbalance is normalized by the total and scaled down as
    /// volume grows, so thin markets swing the speed harder.
    pub fn speed_multiplier(&self) -> f32 {
        let total = self.total();
        let delta = self.buy_or_zero() - self.sell_or_zero();
        let normalized = if total > 0.0 { delta / total } else { 0.0 };

        let scale = if total > HIGH_VOLUME {
            0.5
        } else if total > MEDIUM_VOLUME {
            1.0
        } else {
            2.0
        };
        (1.0 + normalized * scale).max(1.0) as f32
    }
}

/// Whether either source's sells make up at least half of all volume
pub fn sell_pressure(a: &VolumeSample, b: &VolumeSample) -> bool {
    let total = a.total() + b.total();
    if total <= 0.0 {
        return false;
    }
    a.sell_or_zero() / total >= SELL_PRESSURE_SHARE || b.sell_or_zero() / total >= SELL_PRESSURE_SHARE
}
