pub mod auth;
pub mod geo;
pub mod media;
pub mod trips;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::warn;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/trips", trips::router())
        .nest("/media", media::router())
        .nest("/geo", geo::router())
        .nest_service("/files", ServeDir::new(state.media.root()))
        .layer(ServiceBuilder::new().layer(cors_layer(&state.config.frontend_origin)))
        .with_state(state)
}

fn cors_layer(frontend_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);
    match frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(err) => {
            warn!("invalid FRONTEND_ORIGIN, browser requests will be blocked: {err}");
            layer
        }
    }
}
