//! HTTPS listener backed by rustls.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;

use super::shutdown::shutdown_signal;
use super::{ServerError, ServerResult};
use crate::TRACING_TARGET_SERVER_STARTUP;

/// Serves `app` over TLS until a shutdown signal, then drains for `grace`.
pub async fn serve_tls(
    app: Router,
    addr: SocketAddr,
    (cert, key): (&Path, &Path),
    grace: Duration,
) -> ServerResult<()> {
    ensure_pem_file(cert, "certificate")?;
    ensure_pem_file(key, "private key")?;

    let rustls = RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(|e| ServerError::Tls(format!("cannot load {}: {e}", cert.display())))?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        cert = %cert.display(),
        "TLS certificate loaded"
    );

    let handle = Handle::new();
    let trigger = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.graceful_shutdown(Some(grace));
    });

    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(ServerError::Runtime)
}

/// Fails early with the offending path instead of a bare rustls error.
fn ensure_pem_file(path: &Path, what: &str) -> ServerResult<()> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ServerError::Tls(format!("{what} {}: {e}", path.display())))?;

    if !metadata.is_file() || metadata.len() == 0 {
        return Err(ServerError::Tls(format!(
            "{what} {} is not a non-empty file",
            path.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn missing_files_are_named() {
        let result = ensure_pem_file(Path::new("nowhere/cert.pem"), "certificate");
        assert!(matches!(result, Err(ServerError::Tls(msg)) if msg.contains("nowhere/cert.pem")));
    }

    #[test]
    fn empty_files_and_directories_are_rejected() -> anyhow::Result<()> {
        let empty = NamedTempFile::new()?;
        assert!(ensure_pem_file(empty.path(), "private key").is_err());

        let dir = tempfile::tempdir()?;
        assert!(ensure_pem_file(dir.path(), "certificate").is_err());

        let mut pem = NamedTempFile::new()?;
        pem.write_all(b"-----BEGIN CERTIFICATE-----")?;
        assert!(ensure_pem_file(pem.path(), "certificate").is_ok());
        Ok(())
    }
}
