//! Entry point: config → telemetry → store clients → gateway →
//! filesystem ops → `tonic` server, with graceful shutdown on
//! SIGINT/SIGTERM (ported from the reference `formicd/main.go` +
//! `service.go` signal handling).

use std::fs;
use std::sync::Arc;

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Identity, Server, ServerTlsConfig};
use tracing::info;

use formicd::config::Config;
use formicd::fsops::FilesystemOps;
use formicd::gateway::{
    GroupStore, MemoryGroupStore, MemoryValueStore, RemoteGroupStore, RemoteValueStore, ValueStore,
};
use formicd::idgen::IdGen;
use formicd::pb::formic::api::api_server::ApiServer;
use formicd::rpc::ApiService;
use formicd::{error::ServerError, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let config = Config::resolve(None);
    info!(port = config.port, path = %config.path.display(), "starting formicd");

    let values: Arc<dyn ValueStore> = connect_value_store(&config).await?;
    let groups: Arc<dyn GroupStore> = connect_group_store(&config).await?;
    let ids = Arc::new(IdGen::new(config.node_id, config.epoch_unix_ms));

    let ops = FilesystemOps::new(values, groups, ids);
    ops.ensure_root().await?;

    let addr = format!("0.0.0.0:{}", config.port).parse()?;
    let service = ApiServer::new(ApiService::new(ops));

    let mut builder = Server::builder();
    if let Some(tls) = server_tls_config(&config)? {
        builder = builder.tls_config(tls)?;
    } else {
        info!("FORMICD_SKIP_MUTUAL_TLS set, serving plaintext h2c");
    }

    info!(%addr, "listening");
    builder
        .add_service(service)
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    Ok(())
}

/// Connects to the configured value-store ring endpoint, or falls back
/// to an in-process store when none is configured — useful for local
/// development, matching the reference's `skipMutualTLS` escape hatch
/// in spirit (no external dependency required to boot).
async fn connect_value_store(config: &Config) -> Result<Arc<dyn ValueStore>, ServerError> {
    if config.oort_value_syndicate.is_empty() {
        info!("no value-store syndicate configured, using in-process store");
        return Ok(Arc::new(MemoryValueStore::new()));
    }
    let channel = dial(&config.oort_value_syndicate, config).await?;
    Ok(Arc::new(RemoteValueStore::new(channel)))
}

async fn connect_group_store(config: &Config) -> Result<Arc<dyn GroupStore>, ServerError> {
    if config.oort_group_syndicate.is_empty() {
        info!("no group-store syndicate configured, using in-process store");
        return Ok(Arc::new(MemoryGroupStore::new()));
    }
    let channel = dial(&config.oort_group_syndicate, config).await?;
    Ok(Arc::new(RemoteGroupStore::new(channel)))
}

async fn dial(endpoint: &str, config: &Config) -> Result<Channel, ServerError> {
    let tls = client_tls_config(config)?;
    let scheme = if tls.is_some() { "https" } else { "http" };
    let uri = format!("{scheme}://{endpoint}");

    let mut ep = Channel::from_shared(uri).map_err(|e| ServerError::Internal(e.to_string()))?;
    if let Some(tls) = tls {
        ep = ep.tls_config(tls).map_err(|e| ServerError::Internal(e.to_string()))?;
    }
    ep.connect()
        .await
        .map_err(|e| ServerError::StoreUnavailable(e.to_string()))
}

fn read_pem(path: std::path::PathBuf) -> Result<Vec<u8>, ServerError> {
    fs::read(&path).map_err(|e| ServerError::Internal(format!("{}: {e}", path.display())))
}

/// `server.crt`/`server.key`/`ca.pem` under `config.path`, per spec.md
/// section 6's cert layout. `None` when `skip_mutual_tls` opts out of TLS
/// entirely (local development without a ring of certs to mint).
fn server_tls_config(config: &Config) -> Result<Option<ServerTlsConfig>, ServerError> {
    if config.skip_mutual_tls {
        return Ok(None);
    }
    let cert = read_pem(config.cert_path("server.crt"))?;
    let key = read_pem(config.cert_path("server.key"))?;
    let ca = read_pem(config.cert_path("ca.pem"))?;
    Ok(Some(
        ServerTlsConfig::new()
            .identity(Identity::from_pem(cert, key))
            .client_ca_root(Certificate::from_pem(ca)),
    ))
}

/// `client.crt`/`client.key`/`ca.pem` under `config.path`, used for mutual
/// TLS to the store syndicates.
fn client_tls_config(config: &Config) -> Result<Option<ClientTlsConfig>, ServerError> {
    if config.skip_mutual_tls {
        return Ok(None);
    }
    let cert = read_pem(config.cert_path("client.crt"))?;
    let key = read_pem(config.cert_path("client.key"))?;
    let ca = read_pem(config.cert_path("ca.pem"))?;
    Ok(Some(
        ClientTlsConfig::new()
            .identity(Identity::from_pem(cert, key))
            .ca_certificate(Certificate::from_pem(ca)),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
