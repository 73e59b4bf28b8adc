//! # chatrelay: HTTP relay between a chat UI and an OpenAI-compatible provider
//!
//! `chatrelay` is a small stateless server that sits between a browser chat client and a single
//! completion provider. It keeps the provider credential on the server side, wraps every user
//! message in a fixed system instruction, and returns only the generated text.
//!
//! ## Endpoints
//!
//! | Route              | Purpose                                                       |
//! |--------------------|---------------------------------------------------------------|
//! | `GET /api/health`  | Liveness probe, never contacts the provider                   |
//! | `POST /api/chat`   | `{message, model?}` in, `{response}` out                      |
//! | `POST /api/upload` | multipart `file` in, `{fileName, response}` out               |
//! | `GET /api/docs`    | Rendered OpenAPI reference                                    |
//!
//! Failures are reported as `{"error": "..."}` with a 400, 413 or 500 status (see [`errors`]).
//!
//! ## Request Flow
//!
//! A chat request is validated in [`api::handlers::chat`], turned into a two-message prompt by
//! [`completion::Relay`], and sent through the [`provider::CompletionProvider`] seam. The reply
//! is trimmed and an empty reply becomes [`completion::NO_RESPONSE`].
//!
//! An upload is streamed to a temporary file by [`uploads`], read back as text, and analysed with
//! the default model. The temporary file is deleted on every path out of the handler.
//!
//! No state is kept between requests; each chat call is a single-turn exchange.
//!
//! ## Configuration
//!
//! See [`config`] for the YAML file layout and environment overrides. Logging goes through
//! `tracing` with optional OTLP export (see [`telemetry`]).

pub mod api;
pub mod completion;
pub mod config;
pub mod errors;
mod openapi;
pub mod provider;
pub mod telemetry;
pub mod uploads;

#[cfg(test)]
pub mod test_utils;

use crate::completion::Relay;
use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::provider::{CompletionProvider, OpenAiProvider};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

/// Room left in the request body limit for multipart boundaries and part headers, on top of the
/// configured file size.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Shared state handed to every handler.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .relay(relay)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub relay: Relay,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allowed = &config.cors.allowed_origins;

    // A wildcard cannot be mixed into an explicit origin list
    let allow_origin = if allowed.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in allowed {
            if let CorsOrigin::Url(url) = origin {
                // Origins are compared without the trailing slash Url::parse adds
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new().allow_origin(allow_origin).allow_methods(Any).allow_headers(Any);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// # Errors
///
/// Returns an error if the CORS configuration contains an origin that is not a valid header value.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let upload_limit = state.config.uploads.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        .route("/api/health", get(api::handlers::health::health))
        .route("/api/chat", post(api::handlers::chat::chat))
        .route(
            "/api/upload",
            post(api::handlers::upload::upload_file).layer(DefaultBodyLimit::max(usize::try_from(upload_limit).unwrap_or(usize::MAX))),
        )
        .with_state(state.clone());

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .merge(api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors_layer),
        );

    Ok(router)
}

/// Main application struct that owns the router and configuration.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the provider client and router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight requests finish and pending
///    spans are flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application talking to the configured OpenAI-compatible provider
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let provider = OpenAiProvider::new(&config.provider)?;
        Self::with_provider(config, Arc::new(provider))
    }

    /// Create an application around an existing provider implementation
    pub fn with_provider(config: Config, provider: Arc<dyn CompletionProvider>) -> anyhow::Result<Self> {
        debug!(
            provider = %config.provider.base_url,
            default_model = %config.provider.default_model,
            upload_dir = %config.uploads.dir.display(),
            "Building relay"
        );

        let relay = Relay::new(provider, config.provider.clone());
        let state = AppState::builder().config(config.clone()).relay(relay).build();
        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Chat relay listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::{StatusCode, header};
    use url::Url;

    #[tokio::test]
    async fn test_cors_wildcard_allows_any_origin() {
        let server = create_test_app(create_test_config("http://127.0.0.1:9/v1"));

        let response = server
            .get("/api/health")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    }

    #[tokio::test]
    async fn test_cors_explicit_origin() {
        let mut config = create_test_config("http://127.0.0.1:9/v1");
        config.cors.allowed_origins = vec![CorsOrigin::Url(Url::parse("http://localhost:5173").unwrap())];
        let server = create_test_app(config);

        let allowed = server
            .get("/api/health")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"))
            .await;
        assert_eq!(allowed.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "http://localhost:5173");

        let other = server
            .get("/api/health")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://evil.example.com"))
            .await;
        assert!(other.maybe_header(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let server = create_test_app(create_test_config("http://127.0.0.1:9/v1"));

        let response = server
            .method(axum::http::Method::OPTIONS, "/api/chat")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"))
            .add_header(header::ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"))
            .add_header(header::ACCESS_CONTROL_REQUEST_HEADERS, HeaderValue::from_static("content-type"))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    }

    #[tokio::test]
    async fn test_docs_served() {
        let server = create_test_app(create_test_config("http://127.0.0.1:9/v1"));

        let response = server.get("/api/docs").await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("chatrelay"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = create_test_app(create_test_config("http://127.0.0.1:9/v1"));

        server.get("/api/nope").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_application_builds_without_contacting_provider() {
        // Provider reachability is only discovered per request
        let config = create_test_config("http://127.0.0.1:9");
        assert!(Application::new(config).is_ok());
    }
}
