#![allow(dead_code)]
//! A simple in-memory metrics recorder for testing.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct TestMetrics {
    counters: Arc<Mutex<HashMap<String, u64>>>,
    histogram_samples: Arc<Mutex<HashMap<String, usize>>>,
}

impl TestMetrics {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get_counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(0)
    }

    pub fn histogram_count(&self, name: &str) -> usize {
        self.histogram_samples
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(0)
    }

    /// Builds an `alertrelay` metrics handle whose counters feed this recorder.
    pub fn handles(&self) -> alertrelay::internal_metrics::Metrics {
        metrics::with_local_recorder(self, alertrelay::internal_metrics::Metrics::new)
    }
}

impl Recorder for TestMetrics {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata) -> Counter {
        Counter::from_arc(Arc::new(MetricCounter {
            name: key.name().to_string(),
            counters: self.counters.clone(),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata) -> Gauge {
        // Not used by the relay
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata) -> Histogram {
        Histogram::from_arc(Arc::new(MetricHistogram {
            name: key.name().to_string(),
            samples: self.histogram_samples.clone(),
        }))
    }
}

#[derive(Debug)]
struct MetricCounter {
    name: String,
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl metrics::CounterFn for MetricCounter {
    fn increment(&self, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(self.name.clone()).or_insert(0) += value;
    }

    fn absolute(&self, _value: u64) {
        // Not implemented
    }
}

#[derive(Debug)]
struct MetricHistogram {
    name: String,
    samples: Arc<Mutex<HashMap<String, usize>>>,
}

impl metrics::HistogramFn for MetricHistogram {
    fn record(&self, _value: f64) {
        let mut samples = self.samples.lock().unwrap();
        *samples.entry(self.name.clone()).or_insert(0) += 1;
    }
}
