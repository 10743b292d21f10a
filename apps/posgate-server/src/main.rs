//! posgate server: signature-verifying gateway in front of a POS REST API.
//!
//! Every request must carry an `x-signature` header produced by a trusted
//! client. Admitted requests are forwarded to the upstream POS API with the
//! gateway's own credential; everything else is answered with `403`.
//!
//! # Usage
//!
//! ```text
//! SECRET_KEY=... POS_API_KEY=... posgate-server
//! posgate-server --health-check
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8787` | Bind address |
//! | `SECRET_KEY` | *(required)* | Shared signing secret |
//! | `POS_API_KEY` | *(required)* | Upstream credential |
//! | `UPSTREAM_URL` | `https://api.ewitypos.com/` | Upstream base URL |
//! | `UPSTREAM_TIMEOUT_SECS` | `30` | Upstream request timeout |
//! | `CORS_ALLOWED_ORIGINS` | `http://localhost:5174` | Comma-separated origins |
//! | `PUBLIC_SCHEME` | `http` | Scheme of the URL clients sign |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use posgate_core::{DEFAULT_LISTEN, GatewayConfig};
use posgate_http::{CorsPolicy, GatewayHttpService, PosApiClient, VerificationGate};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Assemble the HTTP service from configuration.
fn build_service(config: &GatewayConfig) -> Result<GatewayHttpService<PosApiClient>> {
    let gate = VerificationGate::from_config(config);

    let client = PosApiClient::new(
        &config.upstream_url,
        Duration::from_secs(config.upstream_timeout_secs),
    )
    .context("failed to build upstream client")?;

    // Fail at startup rather than on the first admitted request.
    posgate_http::UpstreamCredential::new(config.upstream_api_key.as_str())
        .header_value()
        .context("POS_API_KEY is not a valid header value")?;

    let cors = CorsPolicy::new(config.cors_allowed_origins.iter().cloned());
    Ok(GatewayHttpService::new(client, gate, cors))
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: GatewayHttpService<PosApiClient>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the gateway and requesting the health endpoint.
///
/// Used by container `HEALTHCHECK`s via `--health-check`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200") && response.contains("\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Bind address from `GATEWAY_LISTEN`, readable without the secrets.
fn gateway_listen_addr() -> String {
    std::env::var("GATEWAY_LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN.to_owned())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = gateway_listen_addr().replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = GatewayConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config.log_level)?;

    let service = build_service(&config)?;

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        upstream = %config.upstream_url,
        public_scheme = %config.public_scheme,
        cors_allowed_origins = ?config.cors_allowed_origins,
        version = VERSION,
        "starting posgate server",
    );

    serve(listener, service).await
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig::builder()
            .secret_key("test-shared-secret".into())
            .upstream_api_key("pos-live-key".into())
            .build()
    }

    /// Accept one connection and answer it with `reply`.
    async fn one_shot_server(reply: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        addr
    }

    #[test]
    fn test_should_build_service_from_config() {
        let service = build_service(&config()).unwrap();
        assert!(format!("{service:?}").contains("GatewayHttpService"));
    }

    #[test]
    fn test_should_refuse_credential_that_cannot_be_a_header() {
        let config = GatewayConfig::builder()
            .secret_key("test-shared-secret".into())
            .upstream_api_key("line\nbreak".into())
            .build();
        assert!(build_service(&config).is_err());
    }

    #[tokio::test]
    async fn test_should_pass_health_check_on_running_reply() {
        let addr = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 20\r\n\r\n{\"status\":\"running\"}",
        )
        .await;
        assert!(run_health_check(&addr).await.is_ok());
    }

    #[tokio::test]
    async fn test_should_fail_health_check_on_error_reply() {
        let addr = one_shot_server(
            "HTTP/1.1 403 Forbidden\r\ncontent-length: 17\r\n\r\nInvalid signature",
        )
        .await;
        assert!(run_health_check(&addr).await.is_err());
    }

    #[tokio::test]
    async fn test_should_fail_health_check_without_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(run_health_check(&addr).await.is_err());
    }

    #[test]
    fn test_should_default_listen_address() {
        assert_eq!(DEFAULT_LISTEN, config().gateway_listen);
    }
}
