use std::{sync::Arc, time::Duration};

use notebook::{config, handlers::rest, repository, service::NoteService, storage};

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {e}");
        panic!("failed to load config: {e}");
    });
    tracing::info!("Successfully loaded notebook config");

    // Store connections (runs migrations for Postgres)
    let documents = repository::connect(&cfg.document_store)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to open document store: {e}");
            panic!("failed to open document store: {e}");
        });

    let blobs = storage::connect(&cfg.blob_store).await.unwrap_or_else(|e| {
        tracing::error!("Failed to open blob store: {e}");
        panic!("failed to open blob store: {e}");
    });

    // Service creation
    let service = Arc::new(NoteService::new(documents, blobs));

    // Scheduled image consistency repair
    if let Some(secs) = cfg.reconcile_interval_secs.filter(|secs| *secs > 0) {
        let service = service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            loop {
                interval.tick().await;
                match service.reconcile().await {
                    Ok(report) => tracing::info!(
                        checked = report.checked,
                        repaired = report.repaired.len(),
                        "Reconcile pass finished"
                    ),
                    Err(e) => tracing::error!("Reconcile pass failed: {e}"),
                }
            }
        });
        tracing::info!("Reconciling note images every {} seconds", secs);
    }

    let router = rest::router(service);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.http_port))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind to port {}: {e}", cfg.http_port);
            panic!("failed to bind to port {}: {e}", cfg.http_port);
        });

    match listener.local_addr() {
        Ok(addr) => tracing::info!("Notebook server starting, listening on {}", addr),
        Err(e) => tracing::warn!("Listening on unknown address: {e}"),
    }

    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!("HTTP server error: {e}");
        panic!("failed to start HTTP server: {e}");
    }
}
