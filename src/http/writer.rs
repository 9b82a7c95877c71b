use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

// Lines end with a bare LF, not CRLF.
const LINE_END: &[u8] = b"\n";

/// Serializes the status line, headers and blank separator line.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());
    buf.extend_from_slice(LINE_END);

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(LINE_END);
    }

    // Header/body separator
    buf.extend_from_slice(LINE_END);

    buf
}

/// Writes a response as two writes: the head, then the body.
///
/// The body is never copied into the head buffer.
pub struct ResponseWriter<'a> {
    head: Vec<u8>,
    response: &'a Response,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(response: &'a Response) -> Self {
        Self {
            head: serialize_head(response),
            response,
        }
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub async fn write_to_stream<S>(&self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        stream.write_all(self.head()).await?;

        if !self.response.body.is_empty() {
            stream.write_all(&self.response.body).await?;
        }

        stream.flush().await?;
        Ok(())
    }
}
