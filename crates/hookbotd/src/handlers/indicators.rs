//! Multi-timeframe indicator analysis behind the `analyze` handler.
//!
//! The analysis reads three candle series: 30 minute candles give a short-term
//! moving-average signal, 1 hour candles give momentum (RSI) and volatility
//! (ATR), and 4 hour candles give the trend. The three readings combine into
//! a [`MarketState`].
//!
//! RSI and ATR use Wilder smoothing: an exponential average with
//! `alpha = 1 / window`. RSI seeds its averages with the first price change;
//! ATR seeds with the mean of the first `window` true ranges.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SHORT_MA: usize = 7;
const LONG_MA: usize = 25;
const RSI_WINDOW: usize = 14;
const ATR_WINDOW: usize = 14;

const FLAT_ATR_PERCENT: f64 = 0.5;
const NEUTRAL_RSI_LOW: f64 = 45.0;
const NEUTRAL_RSI_HIGH: f64 = 55.0;

/// OHLC candle series, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Candles {
    /// Opening prices; accepted but unused.
    #[serde(default)]
    pub open: Vec<f64>,
    /// Highs.
    #[serde(default)]
    pub high: Vec<f64>,
    /// Lows.
    #[serde(default)]
    pub low: Vec<f64>,
    /// Closes.
    pub close: Vec<f64>,
}

/// Input to [`analyze`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Timeframes {
    /// 30 minute candles.
    #[serde(rename = "30m")]
    pub thirty_minutes: Candles,
    /// 1 hour candles.
    #[serde(rename = "1h")]
    pub one_hour: Candles,
    /// 4 hour candles.
    #[serde(rename = "4h")]
    pub four_hours: Candles,
}

/// Short-term moving-average signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Short average above the long one.
    Long,
    /// Short average below the long one.
    Short,
    /// Averages equal.
    None,
}

/// Long-term moving-average trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Short average above the long one.
    Long,
    /// Short average below the long one.
    Short,
    /// Averages equal.
    Sideways,
}

/// Combined market classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    /// Low volatility, neutral momentum, no trend: stay out.
    Flet,
    /// Signal and trend agree upwards.
    Buy,
    /// Signal and trend agree downwards.
    Sell,
    /// No clear setup.
    NoTrade,
}

/// 30 minute reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalReading {
    /// 7-period average of closes.
    pub ma7: f64,
    /// 25-period average of closes.
    pub ma25: f64,
    /// Derived signal.
    pub signal: Signal,
}

/// 1 hour reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MomentumReading {
    /// 14-period RSI.
    pub rsi: f64,
    /// 14-period ATR.
    pub atr: f64,
    /// ATR as a percentage of the last close.
    pub atr_percent: f64,
    /// Last close.
    pub price: f64,
}

/// 4 hour reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendReading {
    /// 7-period average of closes.
    pub ma7: f64,
    /// 25-period average of closes.
    pub ma25: f64,
    /// Derived trend.
    pub trend: Trend,
}

/// Result of [`analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Analysis {
    /// 30 minute reading.
    #[serde(rename = "30m")]
    pub thirty_minutes: SignalReading,
    /// 1 hour reading.
    #[serde(rename = "1h")]
    pub one_hour: MomentumReading,
    /// 4 hour reading.
    #[serde(rename = "4h")]
    pub four_hours: TrendReading,
    /// Combined classification.
    pub market_state: MarketState,
    /// `true` when the base asset should be held.
    pub should_hold_base: bool,
    /// Recommended action; mirrors `market_state`.
    pub recommendation: MarketState,
}

/// Reasons an analysis cannot be computed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndicatorError {
    /// A series is too short for its indicator window.
    #[error("{timeframe} needs at least {required} candles, got {actual}")]
    InsufficientData {
        /// Timeframe label.
        timeframe: &'static str,
        /// Minimum number of candles.
        required: usize,
        /// Candles supplied.
        actual: usize,
    },
    /// High, low and close series differ in length.
    #[error("{timeframe} high, low and close series must have equal lengths")]
    MismatchedSeries {
        /// Timeframe label.
        timeframe: &'static str,
    },
    /// The last close was zero or negative.
    #[error("{timeframe} last close must be positive")]
    NonPositivePrice {
        /// Timeframe label.
        timeframe: &'static str,
    },
}

/// Runs the full multi-timeframe analysis.
///
/// # Errors
///
/// Returns [`IndicatorError`] when a series is too short or inconsistent.
pub fn analyze(frames: &Timeframes) -> Result<Analysis, IndicatorError> {
    let thirty_minutes = signal_reading(&frames.thirty_minutes.close)?;
    let one_hour = momentum_reading(&frames.one_hour)?;
    let four_hours = trend_reading(&frames.four_hours.close)?;
    let market_state = market_state(
        one_hour.atr_percent,
        one_hour.rsi,
        four_hours.trend,
        thirty_minutes.signal,
    );
    Ok(Analysis {
        thirty_minutes,
        one_hour,
        four_hours,
        market_state,
        should_hold_base: market_state == MarketState::Buy,
        recommendation: market_state,
    })
}

/// Classifies the market from the combined readings.
#[must_use]
pub fn market_state(atr_percent: f64, rsi: f64, trend: Trend, signal: Signal) -> MarketState {
    let neutral = (NEUTRAL_RSI_LOW..=NEUTRAL_RSI_HIGH).contains(&rsi);
    if atr_percent < FLAT_ATR_PERCENT && neutral && trend == Trend::Sideways {
        return MarketState::Flet;
    }
    let directional = rsi > NEUTRAL_RSI_HIGH || rsi < NEUTRAL_RSI_LOW;
    if atr_percent >= FLAT_ATR_PERCENT && directional && trend != Trend::Sideways {
        match (signal, trend) {
            (Signal::Long, Trend::Long) => return MarketState::Buy,
            (Signal::Short, Trend::Short) => return MarketState::Sell,
            _ => {}
        }
    }
    MarketState::NoTrade
}

/// Mean of the last `window` values, or `None` when fewer are available.
#[must_use]
pub fn simple_moving_average(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = values.get(values.len() - window..)?;
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Wilder RSI of `closes`, or `None` when fewer than `window` price changes
/// are available.
#[must_use]
pub fn relative_strength_index(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let alpha = 1.0 / window as f64;
    let mut changes = closes.windows(2).map(|pair| match pair {
        [previous, current] => current - previous,
        _ => 0.0,
    });
    let first = changes.next()?;
    let mut gain = first.max(0.0);
    let mut loss = (-first).max(0.0);
    for change in changes {
        gain += alpha * (change.max(0.0) - gain);
        loss += alpha * ((-change).max(0.0) - loss);
    }
    if loss == 0.0 {
        return Some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + gain / loss))
}

/// Wilder ATR, or `None` when the series are shorter than `window` or differ
/// in length.
#[must_use]
pub fn average_true_range(high: &[f64], low: &[f64], close: &[f64], window: usize) -> Option<f64> {
    if window == 0 || close.len() < window || high.len() != close.len() || low.len() != close.len()
    {
        return None;
    }
    let true_ranges: Vec<f64> = (0..close.len())
        .map(|index| {
            let (h, l) = (high.get(index)?, low.get(index)?);
            let range = h - l;
            let Some(previous) = index.checked_sub(1).and_then(|prev| close.get(prev)) else {
                return Some(range);
            };
            Some(range.max((h - previous).abs()).max((l - previous).abs()))
        })
        .collect::<Option<_>>()?;

    let seed = true_ranges.get(..window)?;
    let mut atr = seed.iter().sum::<f64>() / window as f64;
    let smoothing = (window - 1) as f64;
    for range in true_ranges.get(window..)? {
        atr = (atr * smoothing + range) / window as f64;
    }
    Some(atr)
}

fn signal_reading(closes: &[f64]) -> Result<SignalReading, IndicatorError> {
    let (ma7, ma25) = moving_averages("30m", closes)?;
    let signal = if ma7 > ma25 {
        Signal::Long
    } else if ma7 < ma25 {
        Signal::Short
    } else {
        Signal::None
    };
    Ok(SignalReading { ma7, ma25, signal })
}

fn trend_reading(closes: &[f64]) -> Result<TrendReading, IndicatorError> {
    let (ma7, ma25) = moving_averages("4h", closes)?;
    let trend = if ma7 > ma25 {
        Trend::Long
    } else if ma7 < ma25 {
        Trend::Short
    } else {
        Trend::Sideways
    };
    Ok(TrendReading { ma7, ma25, trend })
}

fn moving_averages(timeframe: &'static str, closes: &[f64]) -> Result<(f64, f64), IndicatorError> {
    let insufficient = || IndicatorError::InsufficientData {
        timeframe,
        required: LONG_MA,
        actual: closes.len(),
    };
    let short = simple_moving_average(closes, SHORT_MA).ok_or_else(insufficient)?;
    let long = simple_moving_average(closes, LONG_MA).ok_or_else(insufficient)?;
    Ok((short, long))
}

fn momentum_reading(candles: &Candles) -> Result<MomentumReading, IndicatorError> {
    const TIMEFRAME: &str = "1h";
    let required = RSI_WINDOW.max(ATR_WINDOW) + 1;
    if candles.high.len() != candles.close.len() || candles.low.len() != candles.close.len() {
        return Err(IndicatorError::MismatchedSeries {
            timeframe: TIMEFRAME,
        });
    }
    let insufficient = || IndicatorError::InsufficientData {
        timeframe: TIMEFRAME,
        required,
        actual: candles.close.len(),
    };
    if candles.close.len() < required {
        return Err(insufficient());
    }
    let price = *candles.close.last().ok_or_else(insufficient)?;
    if price <= 0.0 {
        return Err(IndicatorError::NonPositivePrice {
            timeframe: TIMEFRAME,
        });
    }
    let rsi = relative_strength_index(&candles.close, RSI_WINDOW).ok_or_else(insufficient)?;
    let atr = average_true_range(&candles.high, &candles.low, &candles.close, ATR_WINDOW)
        .ok_or_else(insufficient)?;
    Ok(MomentumReading {
        rsi,
        atr,
        atr_percent: atr / price * 100.0,
        price,
    })
}
