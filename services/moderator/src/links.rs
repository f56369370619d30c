//! Websocket links to rosbridge-style endpoints.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use ics_core::connection::Connection;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// One live websocket link to a rosbridge endpoint.
///
/// Outbound messages are queued by [`RosBridgeLink::publish`] and delivered
/// by [`RosBridgeLink::flush`]; `clear` drops whatever is still queued. A
/// background read task flips the liveness flag when the peer disappears.
pub struct RosBridgeLink {
    url: String,
    connected: Arc<AtomicBool>,
    sink: Mutex<Option<WsSink>>,
    outbound: Mutex<Vec<Message>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl RosBridgeLink {
    /// Connects to the endpoint and starts the liveness-tracking read task.
    pub async fn connect(url: &str) -> anyhow::Result<Arc<Self>> {
        let (stream, _) = connect_async(url).await?;
        let (sink, mut read) = stream.split();

        let connected = Arc::new(AtomicBool::new(true));
        let link = Arc::new(Self {
            url: url.to_owned(),
            connected: Arc::clone(&connected),
            sink: Mutex::new(Some(sink)),
            outbound: Mutex::new(Vec::new()),
            reader: Mutex::new(None),
        });

        let reader_url = url.to_owned();
        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            connected.store(false, Ordering::SeqCst);
            info!(url = %reader_url, "rosbridge link closed by peer");
        });
        *link.reader.lock().await = Some(reader);

        info!(url, "rosbridge link established");
        Ok(link)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queues a JSON payload for delivery on the next [`flush`](Self::flush).
    pub async fn publish(&self, payload: serde_json::Value) {
        self.outbound
            .lock()
            .await
            .push(Message::Text(payload.to_string()));
    }

    /// Sends every queued message in order.
    pub async fn flush(&self) -> anyhow::Result<()> {
        let pending: Vec<Message> = self.outbound.lock().await.drain(..).collect();
        if pending.is_empty() {
            return Ok(());
        }

        let mut sink = self.sink.lock().await;
        let sink = sink
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("link to {} is already closed", self.url))?;
        for message in pending {
            sink.send(message).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for RosBridgeLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn clear(&self) {
        let dropped = {
            let mut outbound = self.outbound.lock().await;
            let dropped = outbound.len();
            outbound.clear();
            dropped
        };
        if dropped > 0 {
            info!(url = %self.url, dropped, "Dropped queued messages");
        }
    }

    async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(error) = sink.send(Message::Close(None)).await {
                warn!(url = %self.url, %error, "Failed to send the close frame");
            }
        }
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}
