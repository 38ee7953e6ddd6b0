//! In-memory SawitDB stand-in built on `tokio::io::duplex`.

use super::connector::Connector;
use super::protocol::ResponseEnvelope;
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

type Handler = dyn Fn(usize, &str) -> Option<String> + Send + Sync;

/// Newline-terminated success envelope carrying `data`.
pub fn ok_line(data: serde_json::Value) -> String {
    let mut line = serde_json::to_string(&ResponseEnvelope::ok(data)).unwrap_or_default();
    line.push('\n');
    line
}

/// Each connection is served by `handler(connection_index, request_line)`.
///
/// `None` hangs up without answering. A reply without a trailing newline is
/// written and then the connection is closed.
#[derive(Clone)]
pub struct ScriptedConnector {
    handler: Arc<Handler>,
    received: Arc<Mutex<Vec<String>>>,
    connects: Arc<AtomicUsize>,
    failing: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(usize, &str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            received: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Refuses the next `n` connection attempts.
    pub fn fail_connects(&self, n: usize) {
        self.failing.store(n, Ordering::SeqCst);
    }

    /// Request lines received so far, without terminators.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("received lock poisoned").clone()
    }

    /// Successful connections so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Stream = DuplexStream;

    async fn connect(&self, addr: &str, _timeout: Duration) -> io::Result<DuplexStream> {
        let refused = self
            .failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{addr} refused"),
            ));
        }

        let index = self.connects.fetch_add(1, Ordering::SeqCst);
        let (client, server) = tokio::io::duplex(64 * 1024);
        let handler = Arc::clone(&self.handler);
        let received = Arc::clone(&self.received);

        tokio::spawn(async move {
            let mut reader = BufReader::new(server);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let request = line.trim_end_matches(['\r', '\n']).to_string();
                received.lock().expect("received lock poisoned").push(request.clone());
                let Some(reply) = handler(index, &request) else {
                    break;
                };
                let written = reader.get_mut().write_all(reply.as_bytes()).await;
                if written.is_err() || !reply.ends_with('\n') {
                    break;
                }
            }
        });

        Ok(client)
    }
}
