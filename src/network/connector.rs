use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream, lookup_host};

/// Opens the byte stream a [`RemoteClient`](super::RemoteClient) talks over.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn connect(&self, addr: &str, timeout: Duration) -> io::Result<Self::Stream>;
}

/// Plain TCP with keep-alive enabled.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    pub keepalive: bool,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self { keepalive: true }
    }
}

impl TcpConnector {
    async fn dial(&self, addr: &str) -> io::Result<TcpStream> {
        let mut last_err = None;
        for socket_addr in lookup_host(addr).await? {
            let socket = if socket_addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            socket.set_keepalive(self.keepalive)?;
            match socket.connect(socket_addr).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("{addr} resolved to no addresses"))
        }))
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, addr: &str, timeout: Duration) -> io::Result<TcpStream> {
        tokio::time::timeout(timeout, self.dial(addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, format!("dial {addr} timed out")))?
    }
}
