use crate::protocol::Event;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

const LOG_TARGET: &str = "events";

/// Destination for protocol events.
///
/// Implementations must write each event as one indivisible record, even when
/// called concurrently from several stages.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event) -> BoxFuture<'_, ()>;
}

/// Writes one JSON object per line and flushes after every record.
pub struct JsonLinesEmitter<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for JsonLinesEmitter<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W> JsonLinesEmitter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

impl JsonLinesEmitter<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> EventSink for JsonLinesEmitter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn emit(&self, event: Event) -> BoxFuture<'_, ()> {
        async move {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(target: LOG_TARGET, error = %e, ?event, "failed to serialize event");
                    return;
                }
            };

            let mut writer = self.writer.lock().await;
            if let Err(e) = write_line(&mut *writer, &json).await {
                tracing::warn!(target: LOG_TARGET, error = %e, "failed to write event");
            }
        }
        .boxed()
    }
}

async fn write_line<W>(writer: &mut W, json: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut record = String::with_capacity(json.len() + 1);
    record.push_str(json);
    record.push('\n');
    writer.write_all(record.as_bytes()).await?;
    writer.flush().await
}

/// Forwards events into an in-process channel instead of a byte stream.
#[derive(Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEmitter {
    fn emit(&self, event: Event) -> BoxFuture<'_, ()> {
        async move {
            if self.tx.send(event).is_err() {
                tracing::debug!(target: LOG_TARGET, "event receiver dropped");
            }
        }
        .boxed()
    }
}
