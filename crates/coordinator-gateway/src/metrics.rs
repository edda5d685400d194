//! Prometheus metrics exposed at `/metrics`.
//!
//! Naming convention: `coordinator_<subject>_<metric>[_unit]`.
//!
//! - `coordinator_registrations_total` / `coordinator_registrations_failed_total`
//! - `coordinator_registered_services` (gauge)
//! - `coordinator_dispatch_total{outcome}`
//! - `coordinator_dispatch_duration_seconds` (histogram)

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, exponential_buckets,
};

/// Outcome label for a successful dispatch.
pub const OUTCOME_SUCCESS: &str = "success";

/// Gateway-local metric set.  Each instance owns its own [`Registry`], so
/// several gateways (e.g. in tests) never collide on registration.
pub struct GatewayMetrics {
    registry: Registry,
    registrations: IntCounter,
    registrations_failed: IntCounter,
    registered_services: IntGauge,
    dispatches: IntCounterVec,
    dispatch_duration: Histogram,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let registrations = IntCounter::new(
            "coordinator_registrations_total",
            "Total successful service registrations",
        )?;
        let registrations_failed = IntCounter::new(
            "coordinator_registrations_failed_total",
            "Total rejected service registrations",
        )?;
        let registered_services = IntGauge::new(
            "coordinator_registered_services",
            "Number of services currently in the registry",
        )?;
        let dispatches = IntCounterVec::new(
            Opts::new("coordinator_dispatch_total", "Dispatch requests by outcome"),
            &["outcome"],
        )?;
        let dispatch_duration = Histogram::with_opts(
            HistogramOpts::new(
                "coordinator_dispatch_duration_seconds",
                "End-to-end dispatch latency",
            )
            .buckets(exponential_buckets(0.005, 2.0, 14)?),
        )?;

        registry.register(Box::new(registrations.clone()))?;
        registry.register(Box::new(registrations_failed.clone()))?;
        registry.register(Box::new(registered_services.clone()))?;
        registry.register(Box::new(dispatches.clone()))?;
        registry.register(Box::new(dispatch_duration.clone()))?;

        Ok(Self {
            registry,
            registrations,
            registrations_failed,
            registered_services,
            dispatches,
            dispatch_duration,
        })
    }

    /// Record a successful registration and the new registry size.
    pub fn registration_succeeded(&self, registered: usize) {
        self.registrations.inc();
        self.set_registered_services(registered);
    }

    pub fn registration_failed(&self) {
        self.registrations_failed.inc();
    }

    pub fn set_registered_services(&self, registered: usize) {
        self.registered_services
            .set(i64::try_from(registered).unwrap_or(i64::MAX));
    }

    pub fn observe_dispatch(&self, outcome: &str, elapsed_secs: f64) {
        self.dispatches.with_label_values(&[outcome]).inc();
        self.dispatch_duration.observe(elapsed_secs);
    }

    pub fn dispatch_count(&self, outcome: &str) -> u64 {
        self.dispatches.with_label_values(&[outcome]).get()
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_all_families() {
        let metrics = GatewayMetrics::new().unwrap();
        metrics.registration_succeeded(3);
        metrics.registration_failed();
        metrics.observe_dispatch(OUTCOME_SUCCESS, 0.02);
        metrics.observe_dispatch("no_match", 0.001);

        let text = metrics.render().unwrap();
        assert!(text.contains("coordinator_registrations_total 1"));
        assert!(text.contains("coordinator_registrations_failed_total 1"));
        assert!(text.contains("coordinator_registered_services 3"));
        assert!(text.contains("coordinator_dispatch_total{outcome=\"success\"} 1"));
        assert!(text.contains("coordinator_dispatch_duration_seconds_count 2"));
    }

    #[test]
    fn instances_are_independent() {
        let a = GatewayMetrics::new().unwrap();
        let b = GatewayMetrics::new().unwrap();
        a.observe_dispatch("saturated", 0.0);
        assert_eq!(a.dispatch_count("saturated"), 1);
        assert_eq!(b.dispatch_count("saturated"), 0);
    }
}
