pub mod auth;
pub mod client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod form;
pub mod lookups;
pub mod metrics_defs;
pub mod routes;
pub mod view;

use client::ApiClient;
use errors::RelayError;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use shared::session::Sessions;
use tokio::net::TcpListener;

pub async fn run(config: config::Config, sessions: Sessions) -> Result<(), RelayError> {
    let client = ApiClient::new(config.api.url.clone(), config.api.timeout())?;
    let app = routes::router(client, sessions);

    let host = config.listener.host.as_str();
    let port = config.listener.port;
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, api = %config.api.url, "Relay listener started");

    // The relay holds no state of its own; it is ready once it can accept.
    let admin_service = AdminService::<_, RelayError>::new(|| true);

    let relay_task = async {
        axum::serve(listener, app).await?;
        Ok::<(), RelayError>(())
    };
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(relay_task, admin_task)?;
    Ok(())
}
