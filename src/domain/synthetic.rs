// Synthetic series - Display fallback when no live reading or history exists
use super::display::{local_hour_start, local_midnight};
use super::smoothing::BUFFER_CAPACITY;
use super::telemetry::{CostSample, energy_cost};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Floor for hour/day synthesis.
pub const DETAIL_BASE_FLOOR_WATTS: f64 = 50.0;
/// Floor for buffer pre-seeding.
pub const SEED_BASE_FLOOR_WATTS: f64 = 1.0;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const HOUR_JITTER: f64 = 0.2;
const DAY_JITTER: f64 = 0.1;

/// Time-of-day load multiplier used for day synthesis.
pub fn day_multiplier(hour: u32) -> f64 {
    match hour {
        0..6 => 0.5,
        6..9 => 1.5,
        9..17 => 1.2,
        17..22 => 1.8,
        _ => 0.7,
    }
}

/// Produces plausible-looking cost series. Output is for display only and is
/// never stored or reported as measured telemetry.
#[derive(Debug)]
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A full buffer of flat samples at 1 s spacing, ending at `now_ms`.
    pub fn seed_buffer(
        &self,
        now_ms: i64,
        cached_watts: Option<f64>,
        price_per_kwh: f64,
    ) -> Vec<CostSample> {
        let base = cached_watts.unwrap_or(0.0).max(SEED_BASE_FLOOR_WATTS);
        let cost = energy_cost(base, price_per_kwh);

        (0..BUFFER_CAPACITY)
            .rev()
            .map(|back| CostSample::new(now_ms - back as i64 * 1000, cost))
            .collect()
    }

    /// 60 per-minute samples starting at `hour_start_ms`, ±20% jitter.
    pub fn hour_series(
        &mut self,
        hour_start_ms: i64,
        cached_watts: Option<f64>,
        price_per_kwh: f64,
    ) -> Vec<CostSample> {
        let cost = Self::detail_base_cost(cached_watts, price_per_kwh);

        (0..60)
            .map(|minute| {
                let jitter = self.rng.gen_range(-HOUR_JITTER..=HOUR_JITTER);
                CostSample::new(hour_start_ms + minute * MINUTE_MS, cost * (1.0 + jitter))
            })
            .collect()
    }

    /// 24 samples at the local hourly boundaries of `date`, shaped by
    /// [`day_multiplier`] with ±10% jitter.
    pub fn day_series(
        &mut self,
        date: NaiveDate,
        cached_watts: Option<f64>,
        price_per_kwh: f64,
    ) -> Vec<CostSample> {
        let cost = Self::detail_base_cost(cached_watts, price_per_kwh);
        let midnight = local_midnight(date);
        let mut previous: Option<i64> = None;

        (0..24u32)
            .map(|hour| {
                // An hour skipped by DST sits halfway between its neighbours
                let x = local_hour_start(date, hour)
                    .or_else(|| previous.map(|p| p + HOUR_MS / 2))
                    .unwrap_or(midnight + hour as i64 * HOUR_MS);
                previous = Some(x);

                let jitter = self.rng.gen_range(-DAY_JITTER..=DAY_JITTER);
                CostSample::new(x, cost * day_multiplier(hour) * (1.0 + jitter))
            })
            .collect()
    }

    fn detail_base_cost(cached_watts: Option<f64>, price_per_kwh: f64) -> f64 {
        let base = cached_watts.unwrap_or(0.0).max(DETAIL_BASE_FLOOR_WATTS);
        energy_cost(base, price_per_kwh)
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::display::local_date;
    use chrono::{Local, TimeZone, Timelike};

    #[test]
    fn test_seed_buffer_is_full_and_ends_now() {
        let generator = SyntheticGenerator::with_seed(1);
        let seed = generator.seed_buffer(50_000, Some(230.0), 0.25);

        assert_eq!(seed.len(), BUFFER_CAPACITY);
        assert_eq!(seed.last().unwrap().x, 50_000);
        assert_eq!(seed.first().unwrap().x, 36_000);
        assert!(seed.iter().all(|s| (s.y - 0.0575).abs() < 1e-12));
    }

    #[test]
    fn test_seed_buffer_floor() {
        let generator = SyntheticGenerator::with_seed(1);
        let seed = generator.seed_buffer(0, None, 1.0);
        assert!(seed.iter().all(|s| (s.y - 0.001).abs() < 1e-12));
    }

    #[test]
    fn test_hour_series_shape() {
        let mut generator = SyntheticGenerator::with_seed(7);
        let series = generator.hour_series(3_600_000, Some(200.0), 0.5);
        let base = energy_cost(200.0, 0.5);

        assert_eq!(series.len(), 60);
        for (minute, sample) in series.iter().enumerate() {
            assert_eq!(sample.x, 3_600_000 + minute as i64 * 60_000);
            assert!(sample.y >= base * 0.8 - 1e-12 && sample.y <= base * 1.2 + 1e-12);
        }
    }

    #[test]
    fn test_day_series_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let start = local_midnight(date);
        let mut generator = SyntheticGenerator::with_seed(42);
        let series = generator.day_series(date, Some(10.0), 0.3);

        assert_eq!(series.len(), 24);
        assert_eq!(series[0].x, start);
        for (hour, sample) in series.iter().enumerate() {
            let local = Local.timestamp_millis_opt(sample.x).unwrap();
            assert_eq!(local.hour(), hour as u32);
            assert_eq!(local.date_naive(), date);
        }

        let night_max = series[0..6].iter().map(|s| s.y).fold(f64::MIN, f64::max);
        let evening_min = series[17..22].iter().map(|s| s.y).fold(f64::MAX, f64::min);
        assert!(evening_min > night_max);
    }

    #[test]
    fn test_day_series_stays_on_dst_dates() {
        let mut generator = SyntheticGenerator::with_seed(9);
        let dates = [
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 30).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 26).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 2).unwrap(),
        ];

        for date in dates {
            let series = generator.day_series(date, Some(100.0), 0.2);
            assert_eq!(series.len(), 24);
            assert!(series.windows(2).all(|pair| pair[0].x < pair[1].x));
            assert!(series.iter().all(|s| local_date(s.x) == date), "{date} spills over");
        }
    }

    #[test]
    fn test_day_multiplier_curve() {
        assert_eq!(day_multiplier(3), 0.5);
        assert_eq!(day_multiplier(7), 1.5);
        assert_eq!(day_multiplier(12), 1.2);
        assert_eq!(day_multiplier(20), 1.8);
        assert_eq!(day_multiplier(23), 0.7);
    }
}
