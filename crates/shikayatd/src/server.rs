//! HTTP server wiring for shikayatd.

use crate::routes;
use anyhow::Result;
use axum::Router;
use shikayat_common::auth::{Authenticator, Principal, StoreAuthenticator};
use shikayat_common::classify::llm::{HttpLlmClient, LlmClient};
use shikayat_common::classify::{process_classifier, ComplaintClassifier};
use shikayat_common::config::ShikayatConfig;
use shikayat_common::geocode::{Geocoder, NominatimGeocoder};
use shikayat_common::lifecycle::LifecycleManager;
use shikayat_common::notify::{HttpNotifier, Notifier, NullNotifier};
use shikayat_common::pipeline::SubmissionPipeline;
use shikayat_common::store::ComplaintStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// How long an admin session token stays valid.
pub const SESSION_TTL_HOURS: i64 = 12;

/// A logged-in admin session. Expired entries are swept on login.
pub struct Session {
    pub principal: Principal,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Application state shared across handlers.
pub struct AppState {
    pub store: Arc<ComplaintStore>,
    pub pipeline: Arc<SubmissionPipeline>,
    pub lifecycle: Arc<LifecycleManager>,
    pub authenticator: Arc<dyn Authenticator>,
    /// Opaque session tokens for logged-in admins.
    pub sessions: RwLock<HashMap<String, Session>>,
}

impl AppState {
    /// Wire the full pipeline from config. Degraded backends (notifier,
    /// geocoder, LLM) are logged and left out rather than failing startup.
    pub fn from_config(config: &ShikayatConfig) -> Result<Self> {
        let store = Arc::new(ComplaintStore::open(Path::new(&config.server.db_path))?);
        Ok(Self::assemble(config, store))
    }

    pub fn assemble(config: &ShikayatConfig, store: Arc<ComplaintStore>) -> Self {
        let classifier: Arc<ComplaintClassifier> = process_classifier(config);

        let notifier: Arc<dyn Notifier> = if config.notify.enabled {
            match HttpNotifier::new(config.notify.clone()) {
                Ok(notifier) => Arc::new(notifier),
                Err(e) => {
                    warn!("Notifier unavailable, notifications disabled: {}", e);
                    Arc::new(NullNotifier)
                }
            }
        } else {
            Arc::new(NullNotifier)
        };

        let geocoder: Option<Arc<dyn Geocoder>> = NominatimGeocoder::new(config.geocode.clone())
            .map(|g| Arc::new(g) as Arc<dyn Geocoder>);

        let letter_llm: Option<Arc<dyn LlmClient>> = if config.llm.enabled {
            match HttpLlmClient::new(config.llm.clone()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Letter drafting LLM unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let pipeline = Arc::new(SubmissionPipeline::new(
            config,
            classifier,
            geocoder,
            Arc::clone(&store),
            Arc::clone(&notifier),
            letter_llm,
        ));
        let lifecycle = Arc::new(LifecycleManager::new(Arc::clone(&store), notifier));
        let authenticator = Arc::new(StoreAuthenticator::new(Arc::clone(&store)));

        Self {
            store,
            pipeline,
            lifecycle,
            authenticator,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

/// Assemble the full route tree for a shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::citizen_routes())
        .merge(routes::admin_routes())
        .merge(routes::export_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run(state: AppState, bind_addr: &str) -> Result<()> {
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("  Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
