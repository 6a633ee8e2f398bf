//! Stdio transport loop

use std::io;
use std::sync::Arc;

use parley_protocol::Response;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{Dispatcher, Routed};
use crate::framing::LineFramer;

const READ_CHUNK: usize = 8 * 1024;

type SharedWriter<W> = Arc<Mutex<W>>;

/// Serve JSON-RPC frames from `reader` until end of input.
///
/// Quick requests are answered in arrival order. A feedback call runs in the
/// background so later frames (pings, list, a rejected second call) are still
/// answered while the human thinks. Calls still waiting at end of input are
/// abandoned.
pub async fn serve<R, W>(dispatcher: Arc<Dispatcher>, mut reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer: SharedWriter<W> = Arc::new(Mutex::new(writer));
    let mut framer = LineFramer::new();
    let mut calls: JoinSet<()> = JoinSet::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    info!("MCP server ready on stdio");

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };

        for line in framer.push(&chunk[..n]) {
            handle_line(&dispatcher, &line, &writer, &mut calls).await?;
        }

        while let Some(done) = calls.try_join_next() {
            if let Err(e) = done {
                warn!("Tool call task failed: {}", e);
            }
        }
    }

    framer.finish();

    if !calls.is_empty() {
        info!("Input closed with {} call(s) waiting, abandoning", calls.len());
    }
    calls.shutdown().await;
    debug!("MCP server stopped");
    Ok(())
}

async fn handle_line<W>(
    dispatcher: &Dispatcher,
    line: &str,
    writer: &SharedWriter<W>,
    calls: &mut JoinSet<()>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let Some(request) = dispatcher.parse_frame(line) else {
        return Ok(());
    };

    match dispatcher.route(request) {
        Routed::Immediate(Some(response)) => write_response(writer, &response).await,
        Routed::Immediate(None) => Ok(()),
        Routed::Pending(call) => {
            let writer = writer.clone();
            calls.spawn(async move {
                let response = call.finish().await;
                if let Err(e) = write_response(&writer, &response).await {
                    error!("Failed to write tool result: {}", e);
                }
            });
            Ok(())
        }
    }
}

async fn write_response<W>(writer: &SharedWriter<W>, response: &Response) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = response
        .to_json_line()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut writer = writer.lock().await;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
