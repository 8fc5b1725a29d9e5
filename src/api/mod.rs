pub mod clusters;
pub mod entitlements;
pub mod health;
pub mod investments;
pub mod loans;

use crate::auth::TokenVerifier;
use crate::chain::EntitlementBridge;
use crate::config::Config;
use crate::db::Repository;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub verifier: Arc<dyn TokenVerifier>,
    pub bridge: Arc<EntitlementBridge>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        verifier: Arc<dyn TokenVerifier>,
        bridge: Arc<EntitlementBridge>,
    ) -> Self {
        Self {
            repo,
            config,
            verifier,
            bridge,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/clusters",
            post(clusters::create_cluster).get(clusters::list_clusters),
        )
        .route("/v1/clusters/:id", get(clusters::get_cluster))
        .route("/v1/clusters/fund", post(clusters::fund_cluster))
        .route("/v1/clusters/settle", post(clusters::settle_cluster))
        .route("/v1/clusters/close", post(clusters::close_cluster))
        .route("/v1/investments", post(investments::admit_investment))
        .route("/v1/entitlements", get(entitlements::list_own_entitlements))
        .route(
            "/v1/entitlements/reconcile",
            post(entitlements::reconcile_entitlements),
        )
        .route("/v1/loans", post(loans::create_loan_campaign))
        .layer(cors)
        .with_state(state)
}
