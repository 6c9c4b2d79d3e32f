// Newline-delimited JSON-RPC over stdin/stdout

use crate::protocol::{CancelledParams, JsonRpcError, JsonRpcResponse};
use crate::server::McpServer;
use anyhow::Result;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

pub async fn serve_stdio(server: Arc<McpServer>) -> Result<()> {
    serve(server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve until the reader hits EOF. Requests run concurrently; a
/// `notifications/cancelled` for an in-flight id aborts its task and no
/// response is written for it.
pub async fn serve<R, W>(server: Arc<McpServer>, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        let mut sink = FramedWrite::new(writer, LinesCodec::new());
        while let Some(line) = rx.recv().await {
            if let Err(e) = sink.send(line).await {
                error!(error = %e, "Failed to write response");
                break;
            }
        }
    });

    let mut tasks = JoinSet::new();
    let mut in_flight: HashMap<String, AbortHandle> = HashMap::new();

    info!("MCP stdio transport ready");

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("Discarding oversized message");
                send(&tx, &parse_error());
                continue;
            }
            Err(LinesCodecError::Io(e)) => {
                error!(error = %e, "Failed to read from stdin");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Failed to parse message");
                send(&tx, &parse_error());
                continue;
            }
        };

        if let Some(request_id) = cancelled_request(&message) {
            match in_flight.remove(&request_id) {
                Some(handle) => {
                    handle.abort();
                    info!(request_id = %request_id, "Cancelled in-flight request");
                }
                None => debug!(request_id = %request_id, "Cancellation for unknown request"),
            }
            continue;
        }

        while tasks.try_join_next().is_some() {}
        in_flight.retain(|_, handle| !handle.is_finished());

        let key = message.get("id").map(Value::to_string);
        let server = server.clone();
        let tx = tx.clone();
        let handle = tasks.spawn(async move {
            if let Some(response) = server.handle_value(message).await {
                send(&tx, &response);
            }
        });

        if let Some(key) = key {
            in_flight.insert(key, handle);
        }
    }

    debug!(pending = tasks.len(), "Input closed, draining in-flight requests");
    while tasks.join_next().await.is_some() {}

    drop(tx);
    if let Err(e) = writer_task.await {
        error!(error = %e, "Writer task failed");
    }

    info!("MCP stdio transport stopped");
    Ok(())
}

fn cancelled_request(message: &Value) -> Option<String> {
    if message.get("method").and_then(Value::as_str) != Some("notifications/cancelled") {
        return None;
    }
    let params: CancelledParams = serde_json::from_value(message.get("params")?.clone()).ok()?;
    Some(params.request_id.to_string())
}

fn parse_error() -> Value {
    serde_json::to_value(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
        .unwrap_or(Value::Null)
}

fn send(tx: &mpsc::UnboundedSender<String>, message: &Value) {
    if tx.send(message.to_string()).is_err() {
        warn!("Response dropped, writer has shut down");
    }
}
