use std::sync::Arc;
use tokio::{net::TcpListener, sync::Semaphore};
use tracing::{debug, error, info};

use crate::server::{handler, ServerState};

/// Accepts connections forever, one task per connection.
///
/// At most `max_connections` connections are served at once; further
/// clients wait in the accept backlog. No single connection's failure stops
/// the loop.
pub async fn accept_connections(listener: TcpListener, state: Arc<ServerState>) {
    // Connection limiter to prevent resource exhaustion
    let semaphore = Arc::new(Semaphore::new(state.config.max_connections));

    loop {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Connection limiter closed: {}", e);
                return;
            }
        };

        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("Accepted connection from {}", addr);
                let state = state.clone();
                tokio::spawn(async move {
                    let _permit = permit; // Hold permit until connection ends
                    match handler::handle_connection(stream, state, addr).await {
                        Ok(()) => info!("Connection closed: {}", addr),
                        Err(e) => info!("Connection {} ended: {}", addr, e),
                    }
                });
            }
            Err(e) => error!("Accept error: {}", e),
        }
    }
}
