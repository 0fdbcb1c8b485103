//! STDIO transport implementation.
//!
//! Line-delimited JSON-RPC: one request per line on stdin, one response per
//! line on stdout. Requests run concurrently and responses are written as they
//! complete, so clients must match them by id. Requests without an id are
//! treated as notifications and get no response. Logs go to stderr so they
//! never interleave with responses.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use super::TransportResult;
use super::rpc::{JsonRpcRequest, JsonRpcResponse, process_request};
use crate::core::BrokerServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Run the STDIO transport until stdin is closed.
    pub async fn run(server: BrokerServer) -> TransportResult<()> {
        info!("Ready - reading JSON-RPC requests from stdin");
        Self::serve(server, tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests read from `reader`, writing responses to `writer`.
    ///
    /// Returns once the input is exhausted and every pending request has
    /// been answered.
    pub async fn serve<R, W>(server: BrokerServer, reader: R, mut writer: W) -> TransportResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut pending = FuturesUnordered::new();
        let mut input_open = true;

        loop {
            tokio::select! {
                line = lines.next_line(), if input_open => {
                    let Some(line) = line? else {
                        input_open = false;
                        continue;
                    };
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                        Ok(request) => pending.push(answer(&server, request)),
                        Err(e) => {
                            warn!("Discarding malformed request line: {}", e);
                            let response =
                                JsonRpcResponse::parse_error(format!("Parse error: {e}"));
                            write_response(&mut writer, &response).await?;
                        }
                    }
                }
                Some(response) = pending.next(), if !pending.is_empty() => {
                    if let Some(response) = response {
                        write_response(&mut writer, &response).await?;
                    }
                }
                else => break,
            }
        }

        info!("STDIO transport finished");
        Ok(())
    }
}

/// Process one request; notifications produce no response.
async fn answer(server: &BrokerServer, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let is_notification = request.id.is_none();
    let response = process_request(server, request).await;
    (!is_notification).then_some(response)
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> TransportResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut json = serde_json::to_string(response)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
