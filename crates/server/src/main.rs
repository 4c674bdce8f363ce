//! Photobeam - photo folder notification service

use anyhow::{Context, Result};
use catalog::PhotoCatalog;
use clap::Parser;
use server_lib::{app, NotificationBus};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use watcher::{scan_folder, FolderWatcher, PeriodicSweep};

/// Photobeam - pushes newly discovered photos to live subscribers
#[derive(Parser)]
#[command(name = "photobeam")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP listen address
    #[arg(long, default_value = "0.0.0.0:6740")]
    listen: SocketAddr,

    /// Path to the watched photo folder
    #[arg(long)]
    photo_folder: PathBuf,

    /// Root of the built browser UI
    #[arg(long, default_value = "photobeam-web/dist")]
    web_dist: PathBuf,

    /// Seconds between sweep re-scans of the photo folder (0 disables)
    #[arg(long, default_value_t = 300)]
    sweep_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let catalog = Arc::new(PhotoCatalog::new());

    // Establish the ordering baseline before any live event can arrive.
    let seeded = scan_folder(&cli.photo_folder, &catalog)
        .context("Bootstrap scan of the photo folder failed")?;
    info!("Catalog seeded with {} photos", seeded);

    let bus = NotificationBus::spawn(catalog.clone());

    // Everything the watcher and sweep discover flows through this
    // channel into the bus, in ingestion order.
    let (new_photos, mut new_photos_rx) = mpsc::unbounded_channel();
    {
        let bus = bus.clone();
        tokio::spawn(async move {
            while let Some(entry) = new_photos_rx.recv().await {
                bus.publish(entry);
            }
        });
    }

    let folder_watcher = FolderWatcher::new(
        cli.photo_folder.clone(),
        catalog.clone(),
        new_photos.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = folder_watcher.run().await {
            error!("Folder watcher stopped: {:#}", e);
        }
    });

    if cli.sweep_interval > 0 {
        let sweep = PeriodicSweep::new(
            cli.photo_folder.clone(),
            Duration::from_secs(cli.sweep_interval),
            catalog.clone(),
            new_photos,
        );
        tokio::spawn(async move {
            if let Err(e) = sweep.run().await {
                error!("Periodic sweep stopped: {:#}", e);
            }
        });
    }

    let router = app(bus, cli.photo_folder.clone(), cli.web_dist.clone());

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;
    info!("Open HTTP socket at {}", cli.listen);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Resolve when the process is asked to stop, letting in-flight
/// sessions close their transports before exit.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down");
}
