//! In-process counters and latency statistics for the decision engine.

use crate::types::decision::FinalDecision;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for engine activity
pub struct EngineMetrics {
    /// Transactions that produced a decision
    pub evaluations: AtomicU64,
    /// Requests rejected by validation
    pub validation_failures: AtomicU64,
    /// Requests aborted because the model could not score
    pub model_failures: AtomicU64,
    /// Decisions delivered without a durable audit entry
    pub persistence_failures: AtomicU64,
    /// Decisions forced by a rule override
    pub overrides: AtomicU64,
    decisions: RwLock<BTreeMap<FinalDecision, u64>>,
    /// Evaluation latencies (in microseconds)
    evaluation_times: RwLock<Vec<u64>>,
    /// Probability histogram, 10-point buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            evaluations: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            model_failures: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            overrides: AtomicU64::new(0),
            decisions: RwLock::new(BTreeMap::new()),
            evaluation_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a completed evaluation
    pub fn record_evaluation(
        &self,
        elapsed: Duration,
        probability: f64,
        decision: FinalDecision,
        overridden: bool,
    ) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        if overridden {
            self.overrides.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut by_decision) = self.decisions.write() {
            *by_decision.entry(decision).or_insert(0) += 1;
        }

        if let Ok(mut times) = self.evaluation_times.write() {
            times.push(elapsed.as_micros() as u64);
            // Keep only the most recent window
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = ((probability / 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_failure(&self) {
        self.model_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        let times = match self.evaluation_times.read() {
            Ok(times) => times,
            Err(_) => return LatencyStats::default(),
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    pub fn get_decisions(&self) -> BTreeMap<FinalDecision, u64> {
        self.decisions.read().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Evaluations per second since creation
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.evaluations.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let evaluations = self.evaluations.load(Ordering::Relaxed);
        let overrides = self.overrides.load(Ordering::Relaxed);
        let latency = self.get_latency_stats();
        let decisions = self.get_decisions();
        let distribution = self.get_probability_distribution();

        info!("==================== DECISION ENGINE SUMMARY ====================");
        info!(
            evaluations,
            throughput = format!("{:.1} tx/s", self.get_throughput()),
            overrides,
            validation_failures = self.validation_failures.load(Ordering::Relaxed),
            model_failures = self.model_failures.load(Ordering::Relaxed),
            persistence_failures = self.persistence_failures.load(Ordering::Relaxed),
            "Totals"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Evaluation latency"
        );
        for (decision, count) in &decisions {
            let pct = if evaluations > 0 {
                (*count as f64 / evaluations as f64) * 100.0
            } else {
                0.0
            };
            info!("  {:<10} {:>8} ({:>5.1}%)", decision.as_str(), count, pct);
        }
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar = "#".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "  p {:>3}-{:<3} {:>8} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                bar
            );
        }
        info!("=================================================================");
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluation latency statistics
#[derive(Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = EngineMetrics::new();

        metrics.record_evaluation(Duration::from_micros(100), 5.0, FinalDecision::Safe, false);
        metrics.record_evaluation(Duration::from_micros(300), 100.0, FinalDecision::Fraud, true);
        metrics.record_persistence_failure();

        assert_eq!(metrics.evaluations.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.overrides.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.persistence_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_decisions().get(&FinalDecision::Fraud), Some(&1));

        let dist = metrics.get_probability_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[9], 1); // 100 lands in the top bucket
    }

    #[test]
    fn test_latency_stats() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.get_latency_stats(), LatencyStats::default());

        for us in [10, 20, 30, 40] {
            metrics.record_evaluation(Duration::from_micros(us), 1.0, FinalDecision::Safe, false);
        }
        let stats = metrics.get_latency_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 25);
        assert_eq!(stats.max_us, 40);
    }
}
