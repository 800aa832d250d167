//! Server module for running Terraform providers
//!
//! Starts the gRPC server over TLS on an ephemeral localhost port and prints
//! the go-plugin handshake line Terraform reads from stdout.

use crate::error::{Result, TfplugError};
use crate::grpc::ProviderService;
use crate::proto::provider_server::ProviderServer as ProtoProviderServer;
use crate::provider::ProviderV2;
use std::env;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::info;

pub const CERT_PATH_ENV: &str = "TF_PLUGIN_CERT";
pub const KEY_PATH_ENV: &str = "TF_PLUGIN_KEY";

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file
    pub cert_path: PathBuf,
    /// Path to TLS key file
    pub key_path: PathBuf,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let certs_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("certs")))
            .unwrap_or_else(|| PathBuf::from("./certs"));

        Self {
            cert_path: env::var(CERT_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| certs_dir.join("localhost.pem")),
            key_path: env::var(KEY_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| certs_dir.join("localhost-key.pem")),
            max_message_size: 256 << 20, // 256MB
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

pub struct ProviderServer<P: ProviderV2> {
    provider: P,
    config: ServerConfig,
}

impl<P: ProviderV2 + 'static> ProviderServer<P> {
    pub fn new(provider: P, config: ServerConfig) -> Self {
        Self { provider, config }
    }

    pub async fn run(self) -> Result<()> {
        // a second install in the same process fails harmlessly
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let cert = tokio::fs::read(&self.config.cert_path).await.map_err(|e| {
            TfplugError::TlsError(format!(
                "Failed to read certificate {}: {}",
                self.config.cert_path.display(),
                e
            ))
        })?;
        let key = tokio::fs::read(&self.config.key_path).await.map_err(|e| {
            TfplugError::TlsError(format!(
                "Failed to read key {}: {}",
                self.config.key_path.display(),
                e
            ))
        })?;
        let tls_config = ServerTlsConfig::new().identity(Identity::from_pem(cert, key));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let bound_addr = listener.local_addr()?;

        println!("1|6|tcp|127.0.0.1:{}|grpc", bound_addr.port());
        info!(port = bound_addr.port(), "Provider server started");

        let service = ProtoProviderServer::new(ProviderService::new(self.provider))
            .max_decoding_message_size(self.config.max_message_size)
            .max_encoding_message_size(self.config.max_message_size);

        Server::builder()
            .tls_config(tls_config)?
            .add_service(service)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await?;

        Ok(())
    }
}

/// Runs `provider` with the default server configuration
pub async fn serve<P: ProviderV2 + 'static>(provider: P) -> Result<()> {
    ProviderServer::new(provider, ServerConfig::default()).run().await
}
