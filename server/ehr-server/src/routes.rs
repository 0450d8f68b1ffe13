pub mod paths;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};

use crate::{
    handlers::{doctors, health, patients, queries, reports, visits},
    middleware::{any_principal, doctors_only, patients_only, require_auth},
    server::EhrServer,
};

pub fn health_routes() -> Router<EhrServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

/// Signup and login, open to anyone
pub fn public_routes() -> Router<EhrServer> {
    Router::new()
        .route(paths::patients::SIGNUP, post(patients::signup))
        .route(paths::patients::LOGIN, post(patients::login))
        .route(paths::doctors::SIGNUP, post(doctors::signup))
        .route(paths::doctors::LOGIN, post(doctors::login))
}

/// Routes behind the access gate. Each method carries its own role whitelist.
pub fn protected_routes(server: &EhrServer) -> Router<EhrServer> {
    Router::new()
        .route(
            paths::patients::ME,
            get(patients::get_profile)
                .put(patients::update_profile)
                .route_layer(from_fn(patients_only)),
        )
        .route(
            paths::patients::PASSWORD,
            put(patients::change_password).route_layer(from_fn(patients_only)),
        )
        .route(
            paths::doctors::ME,
            get(doctors::get_profile)
                .put(doctors::update_profile)
                .route_layer(from_fn(doctors_only)),
        )
        .route(
            paths::doctors::PASSWORD,
            put(doctors::change_password).route_layer(from_fn(doctors_only)),
        )
        .route(
            paths::visits::VISITS,
            get(visits::list_visits)
                .route_layer(from_fn(any_principal))
                .merge(post(visits::create_visit).route_layer(from_fn(doctors_only))),
        )
        .route(
            paths::visits::VISIT_BY_ID,
            get(visits::get_visit).route_layer(from_fn(any_principal)),
        )
        .route(
            paths::reports::REPORTS,
            get(reports::list_reports)
                .route_layer(from_fn(patients_only))
                .merge(post(reports::create_report).route_layer(from_fn(doctors_only))),
        )
        .route(
            paths::queries::QUERIES,
            get(queries::list_queries)
                .route_layer(from_fn(any_principal))
                .merge(post(queries::create_query).route_layer(from_fn(patients_only))),
        )
        .route(
            paths::queries::REPLY,
            post(queries::reply_to_query).route_layer(from_fn(doctors_only)),
        )
        .route_layer(from_fn_with_state(server.clone(), require_auth))
}

pub fn create_routes(server: &EhrServer) -> Router<EhrServer> {
    Router::new()
        .merge(health_routes())
        .merge(public_routes())
        .merge(protected_routes(server))
}
