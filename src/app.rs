use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::{AppConfig, StoreBackend};
use crate::database::{ComplianceStore, Fixture, MemoryStore, PgStore, StoreError, TenantStore};
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, require_tenant_middleware, tenant_context_middleware};
use crate::services::{ComplianceService, InMemoryPreferences, TenantService};

/// Shared handles passed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub compliance: Arc<ComplianceService>,
    pub tenants: Arc<TenantService>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Wire services over a store implementing both store traits
    pub fn new<S>(store: Arc<S>, jwt_secret: &str) -> Self
    where
        S: ComplianceStore + TenantStore + 'static,
    {
        let compliance_store: Arc<dyn ComplianceStore> = store.clone();
        let tenant_store: Arc<dyn TenantStore> = store;

        Self {
            compliance: Arc::new(ComplianceService::new(compliance_store)),
            tenants: Arc::new(TenantService::new(
                tenant_store,
                Arc::new(InMemoryPreferences::default()),
            )),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

/// Build state from configuration, connecting to the configured backend
pub async fn build_state(config: &AppConfig) -> Result<AppState, StoreError> {
    let secret = &config.security.jwt_secret;
    if secret.is_empty() {
        return Err(StoreError::ConfigMissing("SECURITY_JWT_SECRET"));
    }

    match config.store.backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database).await?;
            Ok(AppState::new(Arc::new(store), secret))
        }
        StoreBackend::Memory => {
            let fixture = match &config.store.fixture_path {
                Some(path) => {
                    info!("Seeding memory store from {}", path);
                    Fixture::load(path)?
                }
                None => Fixture::default(),
            };
            Ok(AppState::new(Arc::new(MemoryStore::new(fixture)), secret))
        }
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .with_state(state);

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    router
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{compliance, tenants};

    let tenant_scoped = Router::new()
        .route("/api/compliance/staff", get(compliance::staff_list))
        .route("/api/compliance/summary", get(compliance::summary))
        .route("/api/compliance/staff/:id", get(compliance::staff_get))
        .route(
            "/api/compliance/staff/:id/shift-eligibility",
            get(compliance::shift_eligibility),
        )
        .route_layer(from_fn(require_tenant_middleware));

    Router::new()
        .route("/api/tenants", get(tenants::tenants_get).post(tenants::tenants_post))
        .route("/api/tenants/switch", post(tenants::tenants_switch))
        .merge(tenant_scoped)
        // Layers run bottom-up: JWT first, then tenant resolution
        .route_layer(from_fn_with_state(state.clone(), tenant_context_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::permissive().allow_origin(allowed)
}
