use crate::sparql::query::handle_sparql;
use crate::AppState;
use axum::routing::any;
use axum::Router;

mod params;
mod query;

pub use query::X_CACHE;

pub fn create_sparql_routes() -> Router<AppState> {
    Router::new().route("/sparql", any(handle_sparql))
}
