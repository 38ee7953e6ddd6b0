use super::connector::{Connector, TcpConnector};
use super::protocol::{ResponseEnvelope, decode_response, encode_request};
use crate::core::AqlError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Timeouts and retry policy of a [`RemoteClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub dial_timeout: Duration,
    /// Deadline for one write + read exchange.
    pub io_timeout: Duration,
    pub max_attempts: u32,
    /// Pause after a reconnect fails, before the next attempt.
    pub retry_backoff: Duration,
    pub keepalive: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            keepalive: true,
        }
    }
}

/// Counters since the client was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Individual query attempts, retries included.
    pub attempts: u64,
    /// Reconnects started, successful or not.
    pub reconnects: u64,
    /// Queries that failed after every attempt.
    pub failures: u64,
}

/// Persistent client for the SawitDB line protocol.
///
/// One request is in flight per client: the connection mutex is held across the
/// write and the matching read, so concurrent callers are served in lock order.
/// A failed attempt is followed by a reconnect before the next one.
pub struct RemoteClient<C: Connector = TcpConnector> {
    addr: String,
    config: ClientConfig,
    connector: C,
    conn: Mutex<Option<BufReader<C::Stream>>>,
    reconnect_lock: Mutex<()>,
    attempts: AtomicU64,
    reconnects: AtomicU64,
    failures: AtomicU64,
}

impl RemoteClient<TcpConnector> {
    pub fn new(addr: impl Into<String>, config: ClientConfig) -> Self {
        let connector = TcpConnector {
            keepalive: config.keepalive,
        };
        Self::with_connector(addr, config, connector)
    }
}

impl<C: Connector> RemoteClient<C> {
    /// Creates an unconnected client. The first query connects lazily if
    /// [`connect`](Self::connect) was never called.
    pub fn with_connector(addr: impl Into<String>, config: ClientConfig, connector: C) -> Self {
        Self {
            addr: addr.into(),
            config,
            connector,
            conn: Mutex::new(None),
            reconnect_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    async fn dial(&self) -> Result<BufReader<C::Stream>, AqlError> {
        let stream = self
            .connector
            .connect(&self.addr, self.config.dial_timeout)
            .await
            .map_err(|source| AqlError::Connection {
                addr: self.addr.clone(),
                source,
            })?;
        tracing::info!(addr = %self.addr, "connected to SawitDB");
        Ok(BufReader::new(stream))
    }

    async fn shutdown(conn: Option<BufReader<C::Stream>>) {
        if let Some(conn) = conn {
            let mut stream = conn.into_inner();
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(error = %e, "error while closing SawitDB socket");
            }
        }
    }

    /// Opens a connection, replacing any existing one.
    pub async fn connect(&self) -> Result<(), AqlError> {
        let mut conn = self.conn.lock().await;
        Self::shutdown(conn.take()).await;
        *conn = Some(self.dial().await?);
        Ok(())
    }

    pub async fn close(&self) {
        let mut conn = self.conn.lock().await;
        Self::shutdown(conn.take()).await;
    }

    /// Discards the current socket and reader and dials a new pair.
    ///
    /// Takes the reconnect lock before the connection lock, so concurrent
    /// reconnects run one after another and never overlap a query.
    pub async fn reconnect(&self) -> Result<(), AqlError> {
        let _reconnecting = self.reconnect_lock.lock().await;
        let mut conn = self.conn.lock().await;
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        tracing::info!(addr = %self.addr, "reconnecting to SawitDB");
        Self::shutdown(conn.take()).await;
        *conn = Some(self.dial().await?);
        Ok(())
    }

    /// Sends one statement and returns the `data` of a successful response.
    ///
    /// Every failure, including `success=false` from the engine, is retried up
    /// to `max_attempts` times. The final error names the attempt count.
    pub async fn query(&self, statement: &str) -> Result<serde_json::Value, AqlError> {
        let line = encode_request(statement)?;
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_err = AqlError::NotConnected;

        for attempt in 1..=max_attempts {
            self.attempts.fetch_add(1, Ordering::Relaxed);
            match self.query_once(&line).await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "SawitDB query attempt failed"
                    );
                    last_err = e;
                }
            }

            if attempt < max_attempts {
                if let Err(e) = self.reconnect().await {
                    tracing::warn!(error = %e, "SawitDB reconnect failed");
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
            }
        }

        self.failures.fetch_add(1, Ordering::Relaxed);
        Err(AqlError::RetriesExhausted {
            attempts: max_attempts,
            source: Box::new(last_err),
        })
    }

    async fn query_once(&self, line: &str) -> Result<serde_json::Value, AqlError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(AqlError::NotConnected)?;
        tracing::debug!(statement = line.trim_end(), "sending to SawitDB");

        let deadline = self.config.io_timeout;
        let result = match tokio::time::timeout(deadline, exchange(conn, line)).await {
            Ok(result) => result,
            Err(_) => Err(AqlError::Timeout(self.config.io_timeout)),
        };
        if result.as_ref().is_err_and(AqlError::poisons_connection) {
            *guard = None;
        }
        result?.into_result()
    }
}

async fn exchange<S>(conn: &mut BufReader<S>, line: &str) -> Result<ResponseEnvelope, AqlError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    conn.get_mut().write_all(line.as_bytes()).await?;
    conn.get_mut().flush().await?;

    let mut response = String::new();
    if conn.read_line(&mut response).await? == 0 {
        return Err(AqlError::ConnectionClosed);
    }
    decode_response(&response)
}
