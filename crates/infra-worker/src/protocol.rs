// Wire protocol with worker processes
// Line-delimited requests, sentinel-terminated responses

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use tplprobe_core::port::EngineOutputs;

/// Literal line terminating one response on a worker's stdout.
pub const SENTINEL: &str = "__END__";

/// Prefix of the readiness line a worker emits on stderr before
/// accepting input.
pub const READY_MARKER: &str = "✅";

/// Write one request line. An empty probe is the reserved "enumerate
/// hosted engines" query.
pub async fn send_request<W>(writer: &mut W, probe: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(probe.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Consume output lines until the sentinel (or EOF), then parse the
/// last buffered line starting with `{` as JSON engine -> value.
///
/// Parse failure is non-fatal: the raw buffer is logged and an empty
/// map returned, so callers treat the round as "no data" rather than
/// crashing the session.
pub async fn read_response<R>(language: &str, reader: &mut R) -> std::io::Result<EngineOutputs>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines: Vec<String> = Vec::new();
    let mut buf = String::new();
    loop {
        buf.clear();
        let n = reader.read_line(&mut buf).await?;
        if n == 0 || buf.trim() == SENTINEL {
            break;
        }
        lines.push(buf.clone());
    }

    let candidate = lines.iter().rev().find(|l| l.trim_start().starts_with('{'));
    match candidate.map(|l| serde_json::from_str::<EngineOutputs>(l)) {
        Some(Ok(outputs)) => Ok(outputs),
        Some(Err(e)) => {
            warn!(language = %language, error = %e, raw = %lines.concat(), "unparseable worker response");
            Ok(EngineOutputs::new())
        }
        None => {
            if !lines.is_empty() {
                warn!(language = %language, raw = %lines.concat(), "worker response carried no JSON line");
            }
            Ok(EngineOutputs::new())
        }
    }
}
