//! Plaintext and TLS dialing.

use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::error::ConnectError;

use super::BoxedStream;

/// Format `host:port`, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Connect to `host:port`.
///
/// With `tls_server_name` set, a TLS session is negotiated on top of the TCP
/// connection and the server certificate is verified against that name using
/// the Mozilla root store.
pub async fn dial(
    host: &str,
    port: u16,
    tls_server_name: Option<&str>,
) -> Result<BoxedStream, ConnectError> {
    let addr = join_host_port(host, port);

    debug!("dialing {}", addr);
    let tcp = TcpStream::connect((host, port))
        .await
        .map_err(|source| ConnectError::Dial {
            addr: addr.clone(),
            source,
        })?;

    if let Err(e) = enable_keepalive(&tcp) {
        warn!("failed to enable TCP keepalive: {}", e);
    }

    let Some(name) = tls_server_name else {
        debug!("connected to {} (plain)", addr);
        return Ok(Box::new(tcp));
    };

    let server_name = ServerName::try_from(name.to_string())
        .map_err(|_| ConnectError::InvalidServerName(name.to_string()))?;
    let connector = TlsConnector::from(Arc::new(client_config()));
    let tls = connector
        .connect(server_name, tcp)
        .await
        .map_err(|source| ConnectError::Tls {
            addr: addr.clone(),
            source,
        })?;

    debug!("connected to {} (tls, verified as {})", addr, name);
    Ok(Box::new(tls))
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

fn client_config() -> ClientConfig {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}
