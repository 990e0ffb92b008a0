use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

pub struct MetricsRegistry {
    registry: Registry,
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub login_attempts_total: CounterVec,
    pub emails_total: CounterVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "HTTP requests by method, path and status"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency by method and path",
            ),
            &["method", "path"],
        )?;
        let login_attempts_total = CounterVec::new(
            Opts::new("login_attempts_total", "Login attempts by tenant and outcome"),
            &["tenant", "outcome"],
        )?;
        let emails_total = CounterVec::new(
            Opts::new("emails_total", "Transactional emails by template and outcome"),
            &["template", "outcome"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(login_attempts_total.clone()))?;
        registry.register(Box::new(emails_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            login_attempts_total,
            emails_total,
        }))
    }

    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %err, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics
        .http_requests_total
        .with_label_values(&[&method, &path, &status])
        .inc();
    metrics
        .http_request_duration_seconds
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Collapse identifiers so metric cardinality stays bounded:
/// `/foo-bar/admin/coaches/2f9e...` -> `/:tenant/admin/coaches/:id`.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if is_id_like(s) {
                ":id".to_string()
            } else {
                s.to_string()
            }
        })
        .collect();

    // Tenant-scoped admin paths carry the tenant as the first segment.
    if segments.len() >= 2 && segments[1] == "admin" {
        segments[0] = ":tenant".to_string();
    }

    format!("/{}", segments.join("/"))
}

fn is_id_like(segment: &str) -> bool {
    // UUID shape
    if segment.len() == 36 && segment.chars().filter(|c| *c == '-').count() == 4 {
        return true;
    }
    // Numeric id
    if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    // Long hex token
    segment.len() >= 32 && segment.chars().all(|c| c.is_ascii_hexdigit())
}
