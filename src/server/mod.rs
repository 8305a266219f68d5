// src/server/mod.rs
use crate::api::*;
use crate::config::Config;
use crate::database::DbPool;
use rocket::{routes, Build, Rocket};

pub mod routes;

pub struct ServerState {
    pub config: Config,
    pub db_pool: DbPool,
}

pub fn build_rocket(config: Config, db_pool: DbPool) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", config.server.host.clone()))
        .merge(("port", config.server.port));

    let state = ServerState { config, db_pool };

    rocket::custom(figment).manage(state).mount(
        "/api",
        routes![
            // Health and info endpoints
            routes::health::health_check,
            routes::health::index,
            // Queue generation trigger
            generate_channel_queue,
            generate_channel_queue_get,
            // Dispatch trigger
            run_channel_dispatch,
            run_channel_dispatch_get,
            // Stats endpoints
            get_stats,
            get_history,
        ],
    )
}
