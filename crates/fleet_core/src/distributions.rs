//! Probability distributions for user inter-arrival times.
//!
//! Samples are reseeded per arrival from [stream_seed] so a run is
//! reproducible regardless of how many other random draws happened in between.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::clock::ONE_MIN_MS;
use crate::traffic::DayPeriod;

/// Trait for sampling inter-arrival times (in milliseconds).
pub trait InterArrivalDistribution: Send + Sync + std::fmt::Debug {
    /// Sample the next inter-arrival time in milliseconds.
    /// `arrival_count` is the number of users that have arrived so far.
    /// `current_time_ms` is the current simulation time (for time-of-day patterns).
    fn sample_ms(&self, arrival_count: u64, current_time_ms: u64) -> f64;
}

/// Random stream ids passed to [stream_seed].
pub const ARRIVAL_STREAM: u64 = 0;
pub const LOCATION_STREAM: u64 = 1;
pub const LAYOUT_STREAM: u64 = 2;

/// Seed for draw `index` of `stream` under the scenario `seed`.
///
/// The inputs are combined and passed through the splitmix64 finalizer, so
/// neighbouring scenario seeds, streams and indices give unrelated seeds.
pub fn stream_seed(seed: u64, stream: u64, index: u64) -> u64 {
    let mut z = seed
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(stream.wrapping_mul(0xd1b5_4a32_d192_ed03))
        .wrapping_add(index);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// A unit-mean exponential draw, `-ln(U)` with U in (0, 1].
fn unit_exponential(seed: u64) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let u: f64 = rng.gen();
    -u.max(1e-10).ln()
}

fn exponential_ms(rate_per_min: f64, seed: u64) -> f64 {
    if rate_per_min <= 0.0 {
        return f64::INFINITY;
    }
    unit_exponential(seed) / rate_per_min * ONE_MIN_MS as f64
}

/// Poisson arrivals at a constant rate.
#[derive(Debug, Clone)]
pub struct ExponentialInterArrival {
    /// Expected number of arrivals per minute.
    pub rate_per_min: f64,
    pub seed: u64,
}

impl ExponentialInterArrival {
    pub fn new(rate_per_min: f64, seed: u64) -> Self {
        Self {
            rate_per_min: rate_per_min.max(0.0),
            seed,
        }
    }
}

impl InterArrivalDistribution for ExponentialInterArrival {
    fn sample_ms(&self, arrival_count: u64, _current_time_ms: u64) -> f64 {
        exponential_ms(
            self.rate_per_min,
            stream_seed(self.seed, ARRIVAL_STREAM, arrival_count),
        )
    }
}

/// Pre-defined demand profiles.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum DemandProfileKind {
    /// Constant rate all day.
    #[default]
    Flat,
    /// Low demand at night, peaks in both rush hours.
    DailyPeriods,
    /// Custom per-period multipliers (indexed like [DayPeriod::ALL]).
    Custom([f64; 5]),
}

impl DemandProfileKind {
    pub fn multipliers(&self) -> [f64; 5] {
        match self {
            DemandProfileKind::Flat => [1.0; 5],
            DemandProfileKind::DailyPeriods => [0.3, 2.0, 1.0, 1.8, 0.6],
            DemandProfileKind::Custom(multipliers) => *multipliers,
        }
    }
}

/// Poisson arrivals whose rate is the base rate times the multiplier of the
/// day period, piecewise constant over the day. Sampling inverts the
/// integrated rate, so a draw that outlasts a period carries over into the
/// next one and periods with a zero multiplier receive no arrivals.
#[derive(Debug, Clone)]
pub struct TimeOfDayInterArrival {
    pub base_rate_per_min: f64,
    pub multipliers: [f64; 5],
    pub seed: u64,
}

impl TimeOfDayInterArrival {
    pub fn new(base_rate_per_min: f64, kind: &DemandProfileKind, seed: u64) -> Self {
        Self {
            base_rate_per_min: base_rate_per_min.max(0.0),
            multipliers: kind.multipliers().map(|m| m.max(0.0)),
            seed,
        }
    }

    pub fn rate_at(&self, current_time_ms: u64) -> f64 {
        self.base_rate_per_min * self.multipliers[DayPeriod::at(current_time_ms).index()]
    }
}

impl InterArrivalDistribution for TimeOfDayInterArrival {
    fn sample_ms(&self, arrival_count: u64, current_time_ms: u64) -> f64 {
        // Expected arrivals still to pass before the next one.
        let mut remaining = unit_exponential(stream_seed(self.seed, ARRIVAL_STREAM, arrival_count));
        let mut at = current_time_ms;
        let mut idle_periods = 0;
        loop {
            let rate = self.rate_at(at);
            let period_end = DayPeriod::next_start_ms(at);
            if rate > 0.0 {
                idle_periods = 0;
                let span_mins = (period_end - at) as f64 / ONE_MIN_MS as f64;
                if rate * span_mins >= remaining {
                    return (at - current_time_ms) as f64 + remaining / rate * ONE_MIN_MS as f64;
                }
                remaining -= rate * span_mins;
            } else {
                idle_periods += 1;
                // A whole day of periods without demand: none ever comes.
                if idle_periods > DayPeriod::ALL.len() {
                    return f64::INFINITY;
                }
            }
            at = period_end;
        }
    }
}
