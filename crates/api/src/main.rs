use std::sync::{Arc, mpsc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lingora_observability::init();

    let config = lingora_api::config::AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();

    let services = Arc::new(lingora_api::app::build_services(config));

    // The worker runs on its own thread; the HTTP admin tick shares the same
    // instance for bounded, on-demand draining.
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let worker = services.worker.clone();
    let worker_thread = std::thread::Builder::new()
        .name("import-worker".to_string())
        .spawn(move || worker.run_forever(shutdown_rx))?;

    let app = lingora_api::app::router_with(services);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    let _ = shutdown_tx.send(());
    let _ = worker_thread.join();
    Ok(())
}
