//! Prometheus metrics for support-service.
//!
//! Domain counters live in a `prometheus` registry. HTTP request metrics are
//! recorded by the service-core middleware through the `metrics` facade and
//! exported by the installed Prometheus recorder. `/metrics` renders both.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

pub struct SupportMetrics {
    pub registry: Registry,
    pub chat_messages_total: IntCounter,
    pub faq_matches_total: IntCounterVec,
    pub escalations_total: IntCounterVec,
    pub sessions_total: IntCounterVec,
    pub llm_requests_total: IntCounterVec,
    pub llm_latency_seconds: HistogramVec,
    pub llm_tokens_total: IntCounterVec,
}

static METRICS: OnceLock<SupportMetrics> = OnceLock::new();

/// Handle to the recorder backing the `metrics` facade.
static RECORDER_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

impl SupportMetrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let chat_messages_total = IntCounter::new(
            "support_chat_messages_total",
            "Total customer messages processed",
        )?;

        let faq_matches_total = IntCounterVec::new(
            Opts::new("support_faq_matches_total", "FAQ lookups by outcome"),
            &["outcome"], // matched, unmatched
        )?;

        let escalations_total = IntCounterVec::new(
            Opts::new("support_escalations_total", "Escalation log entries by trigger"),
            &["trigger"], // keyword, model_tag, manual
        )?;

        let sessions_total = IntCounterVec::new(
            Opts::new("support_sessions_total", "Session lifecycle events"),
            &["event"], // started, ended
        )?;

        let llm_requests_total = IntCounterVec::new(
            Opts::new("support_llm_requests_total", "LLM calls by outcome"),
            &["operation", "outcome"],
        )?;

        let llm_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "support_llm_latency_seconds",
                "LLM provider latency in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
            &["operation"],
        )?;

        let llm_tokens_total = IntCounterVec::new(
            Opts::new("support_llm_tokens_total", "Tokens reported by the provider"),
            &["operation", "direction"], // input, output
        )?;

        registry.register(Box::new(chat_messages_total.clone()))?;
        registry.register(Box::new(faq_matches_total.clone()))?;
        registry.register(Box::new(escalations_total.clone()))?;
        registry.register(Box::new(sessions_total.clone()))?;
        registry.register(Box::new(llm_requests_total.clone()))?;
        registry.register(Box::new(llm_latency_seconds.clone()))?;
        registry.register(Box::new(llm_tokens_total.clone()))?;

        Ok(Self {
            registry,
            chat_messages_total,
            faq_matches_total,
            escalations_total,
            sessions_total,
            llm_requests_total,
            llm_latency_seconds,
            llm_tokens_total,
        })
    }
}

/// Initialize metrics. Safe to call more than once; later calls are no-ops.
pub fn init_metrics() {
    if METRICS.get().is_none() {
        match SupportMetrics::new() {
            Ok(metrics) => {
                if METRICS.set(metrics).is_ok() {
                    tracing::info!("Prometheus metrics initialized");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to initialize metrics"),
        }
    }

    RECORDER_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            // Another recorder is already global; keep a detached handle so
            // rendering still works.
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            PrometheusBuilder::new().build_recorder().handle()
        }
    });
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = String::new();

    match METRICS.get() {
        Some(metrics) => {
            let mut buffer = Vec::new();
            let encoder = TextEncoder::new();
            if let Err(e) = encoder.encode(&metrics.registry.gather(), &mut buffer) {
                tracing::error!(error = %e, "Failed to encode metrics");
                return format!("# Failed to encode metrics: {}\n", e);
            }
            output.push_str(&String::from_utf8_lossy(&buffer));
        }
        None => output.push_str("# Metrics registry not initialized\n"),
    }

    if let Some(handle) = RECORDER_HANDLE.get() {
        output.push_str(&handle.render());
    }

    output
}

// Helper functions for recording metrics

pub fn record_chat_message() {
    if let Some(m) = METRICS.get() {
        m.chat_messages_total.inc();
    }
}

pub fn record_faq_lookup(matched: bool) {
    if let Some(m) = METRICS.get() {
        let outcome = if matched { "matched" } else { "unmatched" };
        m.faq_matches_total.with_label_values(&[outcome]).inc();
    }
}

pub fn record_escalation(trigger: &str) {
    if let Some(m) = METRICS.get() {
        m.escalations_total.with_label_values(&[trigger]).inc();
    }
}

pub fn record_session_event(event: &str) {
    if let Some(m) = METRICS.get() {
        m.sessions_total.with_label_values(&[event]).inc();
    }
}

/// Record one LLM call. `outcome` is `ok` or a provider error kind.
pub fn record_llm_request(operation: &str, outcome: &str, duration_secs: f64) {
    if let Some(m) = METRICS.get() {
        m.llm_requests_total
            .with_label_values(&[operation, outcome])
            .inc();
        m.llm_latency_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}

/// Record token usage of one successful LLM call.
pub fn record_llm_tokens(operation: &str, input_tokens: i32, output_tokens: i32) {
    if let Some(m) = METRICS.get() {
        m.llm_tokens_total
            .with_label_values(&[operation, "input"])
            .inc_by(input_tokens.max(0) as u64);
        m.llm_tokens_total
            .with_label_values(&[operation, "output"])
            .inc_by(output_tokens.max(0) as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_and_renders_domain_metrics() {
        init_metrics();
        init_metrics();

        record_chat_message();
        record_escalation("keyword");
        record_llm_request("reply", "ok", 0.2);
        record_llm_tokens("summary", 120, 40);

        let text = get_metrics();
        assert!(text.contains("support_chat_messages_total"));
        assert!(text.contains("support_escalations_total{trigger=\"keyword\"}"));
        assert!(text.contains("support_llm_latency_seconds"));
        assert!(text.contains(
            "support_llm_tokens_total{direction=\"output\",operation=\"summary\"}"
        ));
    }
}
