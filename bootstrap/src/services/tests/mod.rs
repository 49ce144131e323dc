//! Service-specific tests
//!
//! Each service has its own test file. Network services are exercised
//! against small axum servers bound to an ephemeral local port, process
//! services against ordinary unix tools.

#[cfg(test)]
mod node_control;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    /// Standard timeout for async operations in tests
    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Helper to run async operations with timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }

    /// Serve `router` on an ephemeral local port
    pub async fn serve(router: axum::Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    /// A local address nothing is listening on
    pub async fn closed_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    /// Write an executable shell script into `dir`
    #[cfg(unix)]
    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
