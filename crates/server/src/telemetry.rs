use axum::{body::Body, http::Request, response::Response};
use opentelemetry::{
    global,
    trace::{SpanKind, TraceContextExt, Tracer},
    Context, KeyValue,
};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use std::{
    future::Future,
    pin::Pin,
    sync::OnceLock,
    task::{Context as TaskContext, Poll},
};
use tower::{Layer, Service};
use tracing_subscriber::EnvFilter;

use crate::auth::jwt::Claims;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_FILTER: &str = "info,tower_http=info,sqlx=warn,tantivy=warn";

/// Keep the LoggerProvider alive for the process lifetime.
static LOGGER_PROVIDER: OnceLock<opentelemetry_sdk::logs::SdkLoggerProvider> = OnceLock::new();

/// Install the console `tracing` subscriber. `RUST_LOG` overrides the
/// default filter. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn tls_config(endpoint: &str) -> Option<opentelemetry_otlp::tonic_types::transport::ClientTlsConfig> {
    endpoint.starts_with("https://").then(|| {
        opentelemetry_otlp::tonic_types::transport::ClientTlsConfig::new().with_native_roots()
    })
}

/// `OTEL_EXPORTER_OTLP_HEADERS`-style `key=value,key2=value2` pairs as gRPC metadata.
fn otlp_metadata() -> Option<opentelemetry_otlp::tonic_types::metadata::MetadataMap> {
    let raw = std::env::var("OTEL_EXPORTER_OTLP_HEADERS").ok()?;
    let mut metadata = opentelemetry_otlp::tonic_types::metadata::MetadataMap::new();
    for (key, value) in parse_header_pairs(&raw) {
        let key = match tonic::metadata::MetadataKey::from_bytes(
            key.as_bytes(),
        ) {
            Ok(k) => k,
            Err(_) => {
                tracing::warn!(key, "Ignoring invalid OTLP header name");
                continue;
            }
        };
        match value.parse() {
            Ok(v) => {
                metadata.insert(key, v);
            }
            Err(_) => tracing::warn!("Ignoring invalid OTLP header value"),
        }
    }
    Some(metadata)
}

fn parse_header_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_lowercase(), v.to_string()))
        })
        .collect()
}

/// Set up OTLP trace and log export when the `telemetry` flag is on and
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set. Must run inside the Tokio runtime.
///
/// Environment:
///   - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector gRPC address, e.g. `http://localhost:4317`
///   - `OTEL_EXPORTER_OTLP_HEADERS`: extra gRPC metadata, `key=value` comma-separated
///   - `OTEL_SERVICE_NAME`: service name tag (default `capco-server`)
///   - `DEPLOY_ENV`: deployment environment tag (default `development`)
pub fn init_telemetry() {
    if !crate::config::feature_flags().telemetry {
        tracing::info!("Telemetry flag off, OTLP export disabled");
        return;
    }
    let endpoint = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(ep) if !ep.is_empty() => ep,
        _ => {
            tracing::warn!("Telemetry flag on but OTEL_EXPORTER_OTLP_ENDPOINT not set, skipping");
            return;
        }
    };

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "capco-server".to_string());
    let environment = std::env::var("DEPLOY_ENV").unwrap_or_else(|_| "development".to_string());

    let mut span_builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint);
    if let Some(tls) = tls_config(&endpoint) {
        span_builder = span_builder.with_tls_config(tls);
    }
    if let Some(metadata) = otlp_metadata() {
        span_builder = span_builder.with_metadata(metadata);
    }
    let span_exporter = match span_builder.build() {
        Ok(exporter) => exporter,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create OTLP span exporter");
            return;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new("service.version", APP_VERSION))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource.clone())
        .build();
    global::set_tracer_provider(provider);

    // Logs go through the `log` crate bridge, independent of the tracing subscriber.
    let mut log_builder = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint);
    if let Some(tls) = tls_config(&endpoint) {
        log_builder = log_builder.with_tls_config(tls);
    }
    if let Some(metadata) = otlp_metadata() {
        log_builder = log_builder.with_metadata(metadata);
    }
    let log_exporter = match log_builder.build() {
        Ok(exporter) => exporter,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create OTLP log exporter");
            return;
        }
    };

    let logger_provider = LOGGER_PROVIDER.get_or_init(|| {
        opentelemetry_sdk::logs::SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build()
    });
    let bridge = opentelemetry_appender_log::OpenTelemetryLogBridge::new(logger_provider);
    match log::set_boxed_logger(Box::new(bridge)) {
        Ok(()) => log::set_max_level(log::LevelFilter::Info),
        Err(_) => tracing::debug!("log crate logger already set, OTLP log bridge skipped"),
    }

    tracing::info!(endpoint = %endpoint, version = APP_VERSION, "Telemetry initialized");
}

/// Low-cardinality span name: UUID path segments become `{id}`.
fn route_template(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Tower layer that opens an OpenTelemetry server span per HTTP request,
/// tagged with method, route, request id, status and the caller if known.
#[derive(Clone)]
pub struct OtelTraceLayer;

impl<S> Layer<S> for OtelTraceLayer {
    type Service = OtelTraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OtelTraceService { inner }
    }
}

#[derive(Clone)]
pub struct OtelTraceService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for OtelTraceService<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let tracer = global::tracer("capco-server");
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let route = route_template(&path);

        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut attributes = vec![
            KeyValue::new("http.method", method.clone()),
            KeyValue::new("http.route", route.clone()),
            KeyValue::new("http.target", path),
            KeyValue::new("http.request_id", request_id),
        ];
        match req.extensions().get::<Claims>() {
            Some(claims) => attributes.extend([
                KeyValue::new("user.id", claims.sub),
                KeyValue::new("user.role", claims.role.clone()),
                KeyValue::new("auth.status", "authenticated"),
            ]),
            None => attributes.push(KeyValue::new("auth.status", "anonymous")),
        }

        let span = tracer
            .span_builder(format!("{method} {route}"))
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start(&tracer);

        let cx = Context::current_with_span(span);
        let mut inner = self.inner.clone();

        let guard = cx.clone().attach();
        let future = inner.call(req);
        drop(guard);

        Box::pin(async move {
            let response = future.await?;

            let span = cx.span();
            let status = response.status();
            span.set_attribute(KeyValue::new("http.status_code", status.as_u16() as i64));
            if status.is_server_error() {
                span.set_status(opentelemetry::trace::Status::error(status.to_string()));
            } else if status.is_client_error() {
                span.set_attribute(KeyValue::new("error.type", "client_error"));
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_segments_are_templated() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            route_template(&format!("/api/affaires/{id}/audiences")),
            "/api/affaires/{id}/audiences"
        );
        assert_eq!(route_template("/api/affaires/statistiques"), "/api/affaires/statistiques");
        assert_eq!(route_template("/health"), "/health");
    }

    #[test]
    fn header_pairs_are_split_and_trimmed() {
        assert_eq!(
            parse_header_pairs("X-Api-Key = abc, tenant=capco,broken,=x"),
            vec![
                ("x-api-key".to_string(), "abc".to_string()),
                ("tenant".to_string(), "capco".to_string()),
            ]
        );
        assert!(parse_header_pairs("").is_empty());
    }
}
