use crate::completion::CompletionBridge;
use crate::config::AppConfig;
use crate::http::{create_app, serve};
use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::log::{error, info};

pub struct AppHandles {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}
impl AppHandles {
    pub fn new(config: AppConfig, api_key: &str) -> Result<AppHandles> {
        let bridge = CompletionBridge::new(&config.completion, api_key)?;
        info!("Relaying speech input to {}", config.completion.url);

        let address = config.http.address;
        let tls_config = config.http.tls.clone();
        let app = create_app(&config.http, bridge);

        let http_handle = tokio::spawn(async move {
            if let Err(e) = serve(app, address, tls_config).await {
                error!("Server error: {e:?}");
            }
        });

        let tasks = vec![
            ("HTTP Server", http_handle),
            ("Shutdown Signal", tokio::spawn(shutdown_signal())),
        ];
        Ok(AppHandles { tasks })
    }

    pub async fn run(self) {
        let futures: Vec<_> = self
            .tasks
            .into_iter()
            .map(|(name, handle)| {
                info!("Starting task: {name}");
                Box::pin(async move {
                    match handle.await {
                        Ok(_) => info!("{name} task completed, shutting down"),
                        Err(e) => error!("{name} task failed: {e:?}!"),
                    }
                })
            })
            .collect();

        // Wait for any task to complete. All handles are boxed, so when dropped they are cancelled.
        let (_, _, remaining) = futures::future::select_all(futures).await;
        drop(remaining);
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
