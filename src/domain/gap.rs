// Gap compensation - Keeps the streaming chart at a ~1 Hz cadence
use super::smoothing::{BUFFER_CAPACITY, SmoothingBuffer};
use super::telemetry::CostSample;

/// Silence longer than this is filled.
pub const GAP_THRESHOLD_MS: i64 = 3000;

/// Spacing of synthesized samples.
pub const FILL_STEP_MS: i64 = 1000;

/// Flat-carried samples to place between `last` and `next`.
///
/// One sample per missing second (`last.x + 1000`, `last.x + 2000`, ...)
/// strictly before `next.x`, each repeating `last.y`. Only the `max_points`
/// samples closest to `next` are produced.
pub fn fill_gap(last: &CostSample, next: &CostSample, max_points: usize) -> Vec<CostSample> {
    let Some(gap) = next.x.checked_sub(last.x) else {
        return Vec::new();
    };
    if gap <= GAP_THRESHOLD_MS || max_points == 0 {
        return Vec::new();
    }

    let missing = ((gap - 1) / FILL_STEP_MS) as usize;
    let skip = missing.saturating_sub(max_points);

    (skip + 1..=missing)
        .map(|step| CostSample::new(last.x + step as i64 * FILL_STEP_MS, last.y))
        .collect()
}

/// Push `sample` into `buffer`, filling any gap first. Returns the number of
/// synthesized samples inserted.
pub fn append_with_fill(buffer: &mut SmoothingBuffer, sample: CostSample) -> usize {
    let fill = match buffer.last() {
        Some(last) => fill_gap(last, &sample, BUFFER_CAPACITY),
        None => Vec::new(),
    };

    let inserted = fill.len();
    for synthetic in fill {
        buffer.push(synthetic);
    }
    buffer.push(sample);
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::energy_cost;

    #[test]
    fn test_threshold_gap_inserts_nothing() {
        let fill = fill_gap(&CostSample::new(0, 1.0), &CostSample::new(3000, 2.0), 15);
        assert!(fill.is_empty());
    }

    #[test]
    fn test_five_second_gap_is_flat_carried() {
        let fill = fill_gap(&CostSample::new(1000, 0.5), &CostSample::new(6000, 0.9), 15);
        let xs: Vec<i64> = fill.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![2000, 3000, 4000, 5000]);
        assert!(fill.iter().all(|s| s.y == 0.5));
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let fill = fill_gap(&CostSample::new(i64::MAX, 1.0), &CostSample::new(i64::MIN, 1.0), 15);
        assert!(fill.is_empty());

        let fill = fill_gap(&CostSample::new(i64::MIN, 1.0), &CostSample::new(i64::MAX, 1.0), 15);
        assert!(fill.is_empty());

        let fill = fill_gap(&CostSample::new(i64::MIN, 1.0), &CostSample::new(-1, 1.0), 15);
        assert_eq!(fill.len(), 15);
        assert!(fill.iter().all(|s| s.x < 0));
    }

    #[test]
    fn test_out_of_order_sample_not_filled() {
        let fill = fill_gap(&CostSample::new(9000, 1.0), &CostSample::new(1000, 1.0), 15);
        assert!(fill.is_empty());
    }

    #[test]
    fn test_long_gap_keeps_most_recent_fill() {
        let fill = fill_gap(&CostSample::new(0, 1.0), &CostSample::new(3_600_000, 1.0), 15);
        assert_eq!(fill.len(), 15);
        assert_eq!(fill.first().unwrap().x, 3_585_000);
        assert_eq!(fill.last().unwrap().x, 3_599_000);
    }

    #[test]
    fn test_feed_silence_scenario() {
        let price = 0.25;
        let mut buffer = SmoothingBuffer::new();

        let at = |x, watts| CostSample::new(x, energy_cost(watts, price));

        assert_eq!(append_with_fill(&mut buffer, at(0, 100.0)), 0);
        assert_eq!(append_with_fill(&mut buffer, at(1000, 105.0)), 0);
        let inserted = append_with_fill(&mut buffer, at(6000, 110.0));

        assert_eq!(inserted, 4);
        assert_eq!(buffer.len(), 7);

        let samples: Vec<CostSample> = buffer.samples().copied().collect();
        for (offset, sample) in samples[2..6].iter().enumerate() {
            assert_eq!(sample.x, 2000 + offset as i64 * 1000);
            assert!((sample.y - energy_cost(105.0, price)).abs() < 1e-12);
        }
        assert_eq!(samples[6], CostSample::new(6000, energy_cost(110.0, price)));
    }
}
