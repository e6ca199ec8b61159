//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta métricas del servidor: requests por status, conexiones
//! admitidas y redirigidas, y latencias.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Máximo de latencias guardadas para percentiles
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    total_requests: u64,
    status_codes: BTreeMap<u16, u64>,
    admitted: u64,
    redirected: u64,
    /// Latencias en microsegundos (ventana deslizante)
    latencies: VecDeque<u64>,
}

/// Snapshot serializable de las métricas
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub admitted: u64,
    pub redirected: u64,
    pub latency_p50_us: u64,
    pub latency_p95_us: u64,
    pub latency_p99_us: u64,
    pub latency_avg_us: u64,
    pub samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData::default())),
            start_time: Instant::now(),
        }
    }

    // Los contadores siguen siendo válidos aunque otro thread haya hecho panic
    fn data(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registra un request atendido por un worker
    pub fn record_request(&self, status_code: u16, latency: Duration) {
        let mut data = self.data();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);
    }

    /// Registra una conexión admitida al pool
    pub fn record_admitted(&self) {
        self.data().admitted += 1;
    }

    /// Registra una conexión redirigida al respaldo
    pub fn record_redirected(&self) {
        let mut data = self.data();
        data.redirected += 1;
        *data.status_codes.entry(302).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.data();
        let (p50, p95, p99, avg) = percentiles(&data.latencies);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            total_requests: data.total_requests,
            status_codes: data.status_codes.clone(),
            admitted: data.admitted,
            redirected: data.redirected,
            latency_p50_us: p50,
            latency_p95_us: p95,
            latency_p99_us: p99,
            latency_avg_us: avg,
            samples: data.latencies.len(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// (p50, p95, p99, promedio)
fn percentiles(latencies: &VecDeque<u64>) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let avg = sorted.iter().sum::<u64>() / len as u64;

    (
        sorted[len * 50 / 100],
        sorted[len * 95 / 100],
        sorted[len * 99 / 100],
        avg,
    )
}
