use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::ArcShared;

pub mod handle;

/// The control plane lives under `/gemdrive/`; everything else is the data
/// plane and falls through to the method-dispatching handler.
pub fn build(state: ArcShared) -> Router {
    Router::new()
        .route(
            "/gemdrive/create-key",
            post(handle::keys::create)
        )
        .route(
            "/gemdrive/keys/:key",
            put(handle::keys::set)
        )
        .route(
            "/gemdrive/login",
            get(handle::keys::login)
        )
        .route(
            "/gemdrive/remote-get",
            post(handle::remote_get::post)
        )
        .route(
            "/gemdrive/index/*path",
            get(handle::index::get)
        )
        .route(
            "/gemdrive/images/:size/*path",
            get(handle::images::get)
        )
        .fallback(handle::data::handle)
        .layer(ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods(Any)
                .allow_headers(Any))
        )
        .with_state(state)
}
