// Smoothing buffer - Bounded window of recent cost samples
use super::telemetry::CostSample;
use std::collections::VecDeque;

pub const BUFFER_CAPACITY: usize = 15;

/// Weight growth per position, oldest to newest.
const RECENCY_WEIGHT: f64 = 1.2;

#[derive(Debug, Clone, Default)]
pub struct SmoothingBuffer {
    samples: VecDeque<CostSample>,
}

impl SmoothingBuffer {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(BUFFER_CAPACITY + 1),
        }
    }

    pub fn seeded(seed: &[CostSample]) -> Self {
        let mut buffer = Self::new();
        for sample in seed {
            buffer.push(*sample);
        }
        buffer
    }

    /// Append a sample, evicting the oldest once over capacity.
    pub fn push(&mut self, sample: CostSample) {
        self.samples.push_back(sample);
        while self.samples.len() > BUFFER_CAPACITY {
            self.samples.pop_front();
        }
    }

    /// Recency-weighted mean with weights `1.2^i`, where `i = 0` is the oldest
    /// sample. Returns 0 for an empty buffer.
    pub fn estimate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }

        let mut weight = 1.0;
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for sample in &self.samples {
            weighted_sum += sample.y * weight;
            weight_total += weight;
            weight *= RECENCY_WEIGHT;
        }

        weighted_sum / weight_total
    }

    pub fn last(&self) -> Option<&CostSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &CostSample> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[f64]) -> SmoothingBuffer {
        let mut buffer = SmoothingBuffer::new();
        for (i, value) in values.iter().enumerate() {
            buffer.push(CostSample::new(i as i64 * 1000, *value));
        }
        buffer
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buffer = SmoothingBuffer::new();
        for i in 0..100 {
            buffer.push(CostSample::new(i * 1000, i as f64));
            assert!(buffer.len() <= BUFFER_CAPACITY);
        }
        assert_eq!(buffer.len(), BUFFER_CAPACITY);
    }

    #[test]
    fn test_sixteenth_push_evicts_oldest() {
        let values: Vec<f64> = (0..16).map(|v| v as f64).collect();
        let buffer = filled(&values);

        let first = buffer.samples().next().unwrap();
        assert_eq!(first.x, 1000);
        assert_eq!(buffer.last().unwrap().y, 15.0);
    }

    #[test]
    fn test_estimate_favours_recent_samples() {
        let mut values = vec![1.0; 14];
        values.push(10.0);
        let buffer = filled(&values);

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert!(buffer.estimate() > mean);
        assert!(buffer.estimate() < 10.0);
    }

    #[test]
    fn test_estimate_edge_cases() {
        assert_eq!(SmoothingBuffer::new().estimate(), 0.0);
        assert!((filled(&[0.4]).estimate() - 0.4).abs() < 1e-12);
        assert!((filled(&[2.5; 15]).estimate() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_respects_capacity() {
        let seed: Vec<CostSample> = (0..20).map(|i| CostSample::new(i, 1.0)).collect();
        let buffer = SmoothingBuffer::seeded(&seed);
        assert_eq!(buffer.len(), BUFFER_CAPACITY);
        assert_eq!(buffer.last().unwrap().x, 19);
    }
}
