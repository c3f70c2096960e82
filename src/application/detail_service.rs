// Detail service - Drill-down series with synthetic fallback
use crate::application::chart_sink::Notifier;
use crate::application::energy_backend::EnergyBackend;
use crate::application::power_cache::PowerCache;
use crate::domain::display::{DisplayRange, local_date};
use crate::domain::energy::{DetailKind, SharedPrice};
use crate::domain::synthetic::SyntheticGenerator;
use crate::domain::telemetry::CostSample;
use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize)]
pub struct DetailSeries {
    pub kind: DetailKind,
    pub points: Vec<CostSample>,
    /// True when the points were generated for display, not measured.
    pub synthetic: bool,
}

#[derive(Clone)]
pub struct DetailService {
    backend: Arc<dyn EnergyBackend>,
    cache: Arc<dyn PowerCache>,
    notifier: Arc<dyn Notifier>,
    price: SharedPrice,
    generator: Arc<Mutex<SyntheticGenerator>>,
}

impl DetailService {
    pub fn new(
        backend: Arc<dyn EnergyBackend>,
        cache: Arc<dyn PowerCache>,
        notifier: Arc<dyn Notifier>,
        price: SharedPrice,
        generator: SyntheticGenerator,
    ) -> Self {
        Self {
            backend,
            cache,
            notifier,
            price,
            generator: Arc::new(Mutex::new(generator)),
        }
    }

    pub async fn detail(
        &self,
        range: DisplayRange,
        kind: DetailKind,
    ) -> anyhow::Result<DetailSeries> {
        match self.backend.detailed(&range, kind).await {
            Ok(points) if points.iter().any(|p| p.y != 0.0) => Ok(DetailSeries {
                kind,
                points,
                synthetic: false,
            }),
            Ok(_) => {
                tracing::debug!("Empty {:?} detail series, using synthetic fallback", kind);
                Ok(self.synthesize(range, kind))
            }
            Err(e) => {
                tracing::error!("Failed to load {:?} detail: {:#}", kind, e);
                self.notifier.error(&format!("Failed to load detail view: {e}"));
                Err(e)
            }
        }
    }

    fn synthesize(&self, range: DisplayRange, kind: DetailKind) -> DetailSeries {
        let cached = self.cache.load();
        let price = self.price.get();
        let mut generator = match self.generator.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let points = match kind {
            DetailKind::Hour => generator.hour_series(range.from_ms, cached, price),
            DetailKind::Day => generator.day_series(local_date(range.from_ms), cached, price),
        };

        DetailSeries {
            kind,
            points,
            synthetic: true,
        }
    }
}
