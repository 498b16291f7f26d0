use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

use crate::errors::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref TICKS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "simulator_ticks_total",
        "Total fleet-wide ticks fired"
    ))
    .expect("valid metric options");
    pub static ref DELIVERIES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "simulator_deliveries_total",
        "Total readings accepted by the collector"
    ))
    .expect("valid metric options");
    pub static ref DELIVERY_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "simulator_delivery_failures_total",
        "Total delivery attempts that failed or were rejected"
    ))
    .expect("valid metric options");
    pub static ref ACTIVE_DEVICES: Gauge = Gauge::with_opts(Opts::new(
        "simulator_active_devices",
        "Number of devices in the fleet"
    ))
    .expect("valid metric options");
    pub static ref DELIVERY_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "simulator_delivery_latency_seconds",
            "Round-trip time of a single delivery attempt"
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    )
    .expect("valid metric options");
}

pub fn init_metrics() -> Result<()> {
    REGISTRY.register(Box::new(TICKS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DELIVERIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DELIVERY_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACTIVE_DEVICES.clone()))?;
    REGISTRY.register(Box::new(DELIVERY_LATENCY_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| Error::Metrics(prometheus::Error::Msg(format!("metrics output is not UTF-8: {e}"))))
}
