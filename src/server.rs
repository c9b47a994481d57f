//! TCP transport for the session core.
//!
//! Binds a listener per protocol variant, accepts connections under a
//! semaphore limit, and runs one task per connection: read bytes, feed
//! the session, write whatever it says, close when it says so. The
//! session core is uncapped by design, so the buffer-size and idle
//! policies live here, answering 421 before closing.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::protocols::{Outcome, ProtocolMachine};
use crate::response;
use crate::session::Session;

/// Read buffer size per connection
const BUFFER_SIZE: usize = 16 * 1024;

/// Transport policy wrapped around the uncapped session core.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Close (with 421) once a session buffers more than this many
    /// bytes without completing a line or payload.
    pub max_buffer_bytes: usize,
    /// Close (with 421) after this long without a read completing.
    pub idle_timeout: Duration,
}

impl From<&Config> for Limits {
    fn from(config: &Config) -> Self {
        Limits {
            max_buffer_bytes: config.max_buffer_bytes,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

/// One listener plus the machine factory for its protocol variant.
pub struct Server<F> {
    listener: TcpListener,
    limits: Limits,
    connection_limit: Arc<Semaphore>,
    factory: F,
}

impl<F, M> Server<F>
where
    F: Fn() -> M,
    M: ProtocolMachine + Send + 'static,
{
    /// Bind the listener. `factory` builds a fresh machine per
    /// accepted connection.
    pub async fn bind(
        addr: &str,
        limits: Limits,
        max_connections: usize,
        factory: F,
    ) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Server {
            listener,
            limits,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            factory,
        })
    }

    /// Address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(address = %self.listener.local_addr()?, "Server listening");

        loop {
            // Wait for a connection slot
            let permit = self.connection_limit.clone().acquire_owned().await?;

            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "Client connected");

                    let session = Session::new((self.factory)());
                    let limits = self.limits;

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, session, limits).await {
                            debug!(peer = %addr, error = %e, "Connection error");
                        }
                        debug!(peer = %addr, "Client disconnected");
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Handle a single client connection: greeting first, then the strict
/// read → dispatch → write cycle until close.
async fn handle_connection<S, M>(
    mut stream: S,
    mut session: Session<M>,
    limits: Limits,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    M: ProtocolMachine,
{
    stream.write_all(&session.greeting()).await?;

    let mut read_buf = BytesMut::with_capacity(BUFFER_SIZE);
    loop {
        read_buf.clear();
        let n = match timeout(limits.idle_timeout, stream.read_buf(&mut read_buf)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Idle timeout, closing");
                return close_with_421(&mut stream).await;
            }
        };
        if n == 0 {
            trace!("Connection closed by client");
            return Ok(());
        }

        let reaction = session.receive(&read_buf);
        if !reaction.output.is_empty() {
            stream.write_all(&reaction.output).await?;
        }
        if reaction.close {
            return Ok(());
        }

        if session.buffered() > limits.max_buffer_bytes {
            warn!(buffered = session.buffered(), "Buffer limit exceeded, closing");
            return close_with_421(&mut stream).await;
        }
    }
}

async fn close_with_421<S: AsyncWrite + Unpin>(
    stream: &mut S,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let notice = response::encode(&Outcome::reply(421, "Service closing control connection."));
    stream.write_all(&notice).await?;
    Ok(())
}
