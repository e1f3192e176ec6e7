//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (security headers, request ID, tracing, CORS,
//!   request pipeline)
//! - Bind server to listener and serve until shutdown
//! - Run the rate-limit sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::clock::Clock;
use crate::config::{AppConfig, CorsConfig};
use crate::http::middleware::{request_pipeline, PipelineState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::routes::api_routes;
use crate::security::headers::with_security_headers;
use crate::security::{CsrfGuard, ExemptionTable, RateLimiter, SessionAuthenticator};
use crate::users::password::DummyHash;
use crate::users::UserStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<SessionAuthenticator>,
    pub csrf: Arc<CsrfGuard>,
    /// Checked on logins for unknown emails.
    pub dummy_hash: Arc<DummyHash>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        let sessions = Arc::new(SessionAuthenticator::new(&config.session, clock.clone()));
        let csrf = Arc::new(CsrfGuard::new(&config.csrf, &config.session, clock));
        let dummy_hash = Arc::new(DummyHash::new(config.security.bcrypt_cost));
        Self {
            config,
            users,
            sessions,
            csrf,
            dummy_hash,
        }
    }
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    state: AppState,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a server exposing the built-in auth and account routes.
    pub fn new(config: AppConfig, users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_routes(config, users, clock, Router::new())
    }

    /// Create a server that also mounts `routes` behind the pipeline.
    pub fn with_routes(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        routes: Router<AppState>,
    ) -> Self {
        let config = Arc::new(config);
        let rate_limiter = config.rate_limit.enabled.then(|| {
            Arc::new(RateLimiter::new(
                config.rate_limit.requests_per_minute,
                clock.clone(),
            ))
        });
        let state = AppState::new(config.clone(), users, clock);

        let pipeline = PipelineState {
            rate_limiter: rate_limiter.clone(),
            sessions: state.sessions.clone(),
            csrf: state.csrf.clone(),
            public_routes: Arc::new(ExemptionTable::public_default()),
            csrf_exempt: Arc::new(ExemptionTable::csrf_default()),
            body_limit: config.security.max_body_size,
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        };

        let router = Self::build_router(&config, state.clone(), pipeline, routes);
        Self {
            router,
            state,
            rate_limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers listed later wrap the earlier ones, so the security headers
    /// are outermost and see every response.
    fn build_router(
        config: &AppConfig,
        state: AppState,
        pipeline: PipelineState,
        routes: Router<AppState>,
    ) -> Router {
        let router = api_routes()
            .merge(routes)
            .layer(middleware::from_fn_with_state(pipeline, request_pipeline))
            .with_state(state)
            .layer(cors_layer(&config.cors))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer());

        with_security_headers(router, &config.security)
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            app = %self.state.config.app_name,
            "HTTP server starting"
        );

        if let Some(limiter) = &self.rate_limiter {
            tokio::spawn(limiter.clone().run_sweeper(shutdown.subscribe()));
        }

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Credentialed CORS for the configured frontend origins.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ]))
        .allow_headers(AllowHeaders::mirror_request())
}
