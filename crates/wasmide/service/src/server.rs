//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::{MetadataConfig, ObjectStoreConfig, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use wasmide_compiler::CompilationOrchestrator;
use wasmide_projects::{InMemoryProjectStore, ProjectRepository, ProjectStore};
use wasmide_storage::{InMemoryObjectStore, ObjectStorageGateway, ObjectStore};

/// wasmided server
pub struct Server {
    config: ServiceConfig,
    state: AppState,
}

impl Server {
    /// Connect the configured backends and assemble the application state
    pub async fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let objects = ObjectStorageGateway::new(object_store(&config.object_store)?);
        let metadata = metadata_store(&config.metadata).await?;
        let compiler = CompilationOrchestrator::from_config(&config.toolchain);
        info!(compiler = ?compiler, "toolchain configured");

        let repo = ProjectRepository::new(metadata, objects, compiler, config.projects.clone());
        Ok(Self {
            state: AppState::new(repo),
            config,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> ServiceResult<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(self.state, &self.config.server);

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "wasmided listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServiceError::Server(e.to_string()))?;

        info!("wasmided shut down");
        Ok(())
    }
}

fn object_store(config: &ObjectStoreConfig) -> ServiceResult<Arc<dyn ObjectStore>> {
    match config {
        ObjectStoreConfig::Memory { base_url } => {
            warn!("using in-memory object store, files are lost on restart");
            Ok(Arc::new(InMemoryObjectStore::new(base_url.clone())))
        }
        #[cfg(feature = "s3")]
        ObjectStoreConfig::S3(s3) => {
            info!(bucket = %s3.bucket, region = %s3.region, "using s3 object store");
            Ok(Arc::new(wasmide_storage::s3::S3ObjectStore::new(s3)?))
        }
    }
}

async fn metadata_store(config: &MetadataConfig) -> ServiceResult<Arc<dyn ProjectStore>> {
    match config {
        MetadataConfig::Memory => {
            warn!("using in-memory metadata store, projects are lost on restart");
            Ok(Arc::new(InMemoryProjectStore::new()))
        }
        #[cfg(feature = "postgres")]
        MetadataConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            let store = wasmide_projects::store::postgres::PostgresProjectStore::connect_with_options(
                url,
                *max_connections,
                *connect_timeout_secs,
            )
            .await?;
            info!("using postgres metadata store");
            Ok(Arc::new(store))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
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
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("received terminate signal, shutting down");
        }
    }
}
