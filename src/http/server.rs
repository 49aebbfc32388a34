//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up the governance pipeline in its fixed order
//! - Bind server to listener
//! - Graceful shutdown
//!
//! # Pipeline (outermost first)
//! ```text
//! TraceLayer
//!   → request_context_middleware   (correlation ID, echoed on every response)
//!   → CorsLayer
//!   → TimeoutLayer
//!   → identify_client_middleware   (principal / origin / unknown)
//!   → rate_limit_middleware        (may short-circuit with 429 / 503)
//!   → handlers
//! ```

use axum::{
    http::Uri,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::health::health_check;
use crate::http::request::request_context_middleware;
use crate::lifecycle::startup::probe_counter_store;
use crate::security::identity::{identify_client_middleware, IdentityResolver};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::store::CounterStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CounterStore>,
    pub limiter: Arc<RateLimiter>,
    pub store_timeout: Duration,
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    store: Arc<dyn CounterStore>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and counter store.
    pub fn new(config: AppConfig, store: Arc<dyn CounterStore>) -> Self {
        Self::with_routes(config, store, Router::new())
    }

    /// Like `new`, mounting `routes` behind the governance pipeline.
    /// Handlers there see a populated `RequestContext` and never see
    /// rate-limit internals.
    pub fn with_routes(
        config: AppConfig,
        store: Arc<dyn CounterStore>,
        routes: Router<AppState>,
    ) -> Self {
        let store_timeout = config.counter_store.timeout();
        let limiter = Arc::new(RateLimiter::new(store.clone(), &config.rate_limit, store_timeout));

        let state = AppState {
            store: store.clone(),
            limiter,
            store_timeout,
        };

        let router = Self::build_router(&config, state, routes);
        Self {
            router,
            config,
            store,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState, routes: Router<AppState>) -> Router {
        let limiter = state.limiter.clone();

        let mut router = Router::new()
            .route("/health_check", get(health_check))
            .merge(routes)
            .fallback(route_not_found)
            .with_state(state);

        if config.rate_limit.enabled {
            router = router.layer(from_fn_with_state(limiter, rate_limit_middleware));
        } else {
            tracing::warn!("Rate limiting disabled by configuration");
        }

        let resolver = IdentityResolver::new(config.rate_limit.trust_forwarded_for);

        router
            .layer(from_fn_with_state(resolver, identify_client_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CorsLayer::permissive())
            .layer(from_fn(request_context_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.config.rate_limit.limit,
            period_secs = self.config.rate_limit.period_secs,
            failure_mode = ?self.config.rate_limit.failure_mode,
            "HTTP server starting"
        );

        // Probe in the background so a down store never delays accepting.
        let store = self.store.clone();
        let probe_timeout = self.config.counter_store.timeout();
        tokio::spawn(async move {
            probe_counter_store(store.as_ref(), probe_timeout).await;
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::InstanceNotFound(format!("Route {}", uri.path()))
}
