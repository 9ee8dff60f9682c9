use {
    prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, TextEncoder},
    tracing::{error, info},
};

pub fn counter(name: &str, help: &str) -> Counter {
    let counter = Counter::with_opts(Opts::new(name, help)).expect("Invalid counter options");
    register(Box::new(counter.clone()), name);
    counter
}

/// Histogram for in-process operations (microseconds to a millisecond).
pub fn histogram_fast_ops(name: &str, help: &str) -> Histogram {
    histogram(
        name,
        help,
        vec![0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001],
    )
}

/// Histogram for operations that wait on the store (up to a second).
pub fn histogram_slow_ops(name: &str, help: &str) -> Histogram {
    histogram(
        name,
        help,
        vec![0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
    )
}

fn histogram(name: &str, help: &str, buckets: Vec<f64>) -> Histogram {
    let histogram = Histogram::with_opts(HistogramOpts::new(name, help).buckets(buckets))
        .expect("Invalid histogram options");
    register(Box::new(histogram.clone()), name);
    histogram
}

fn register(collector: Box<dyn prometheus::core::Collector>, name: &str) {
    if let Err(e) = prometheus::default_registry().register(collector) {
        error!("Failed to register metric {}: {}", name, e);
    }
}

/// Encodes every registered metric in the Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let registry = prometheus::default_registry();
    let families = registry.gather();
    info!("Registry has {} metrics", families.len());

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
