use std::{io::ErrorKind, sync::Arc};

use axum::{
    routing::{any, get, post},
    Router,
};
use log::{error, info};
use tower_http::services::ServeDir;

use config::Config;
use model::AppState;

mod config;
mod logger;
mod model;
mod routes;

const DEFAULT_CONFIG_PATH: &str = "webgate.toml";

#[tokio::main]
async fn main() {
    logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match Config::load(path.as_ref()) {
        Ok(config) => config,
        Err(config::Error::Io(err)) if err.kind() == ErrorKind::NotFound => {
            info!("No config file at {}; running with defaults", path);
            Config::default()
        }
        Err(err) => {
            error!("Failed to load config from {}: {}", path, err);
            std::process::exit(1);
        }
    };

    info!("Starting webgate server at {}", config.listen);

    let state = Arc::new(AppState::new(config));

    let mut app = Router::new()
        .route("/session", get(routes::current_session))
        .route("/session/logout", post(routes::logout));
    for rule in &state.config.proxy {
        info!("Proxying {}** to {}", rule.prefix, rule.upstream);
        app = app.route(&format!("{}*path", rule.prefix), any(routes::forward));
    }
    let app = app
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .with_state(state.clone());

    axum::Server::bind(&state.config.listen)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
