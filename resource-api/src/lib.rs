pub mod api;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod store;

use errors::ResourceApiError;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use shared::session::Sessions;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use store::Store;
use tokio::net::TcpListener;

pub async fn run(config: config::Config, sessions: Sessions) -> Result<(), ResourceApiError> {
    let ready = Arc::new(AtomicBool::new(false));
    let admin_ready = ready.clone();
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, ResourceApiError>::new(move || admin_ready.load(Ordering::Relaxed)),
    );

    let api_task = async {
        let store = Store::new();
        store.seed(&config.seed)?;
        tracing::info!(
            employees = config.seed.employees.len(),
            projects = config.seed.projects.len(),
            task_items = config.seed.task_items.len(),
            "Store seeded"
        );

        let host = config.listener.host.as_str();
        let port = config.listener.port;
        let listener = TcpListener::bind(format!("{host}:{port}")).await?;
        tracing::info!(host, port, "Resource API listener started");
        ready.store(true, Ordering::Relaxed);

        axum::serve(listener, api::router(store, sessions)).await?;
        Ok::<(), ResourceApiError>(())
    };

    tokio::try_join!(api_task, admin_task)?;
    Ok(())
}
