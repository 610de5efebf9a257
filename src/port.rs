//! Ephemeral port allocation for the driver's control endpoint.

use tokio::net::TcpListener;
use tracing::debug;

use crate::error::LauncherError;

/// Asks the OS for a free loopback TCP port and returns it.
///
/// The listener is closed before the port number is handed back, so another
/// process can claim the port before the driver binds it. That race window
/// is accepted; the driver's own bind failure surfaces through the
/// supervisor's launch report.
pub async fn allocate_ephemeral_port() -> Result<u16, LauncherError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|source| LauncherError::PortAllocation { source })?;
    let addr = listener
        .local_addr()
        .map_err(|source| LauncherError::PortAllocation { source })?;
    drop(listener);

    if addr.port() == 0 {
        return Err(LauncherError::PortUnavailable);
    }
    debug!(port = addr.port(), "allocated ephemeral port");
    Ok(addr.port())
}
