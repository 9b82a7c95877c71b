use crate::http::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace was received.
    Empty,
    /// A method token without a path.
    MissingPath,
}

/// Extracts the request path from the raw bytes of a single read.
///
/// The buffer is tokenized on ASCII whitespace; the first token is the
/// method and the second the path. Everything after the second token is
/// ignored, including the version and headers. A truncated request is
/// parsed as-is.
pub fn parse_request(buf: &[u8]) -> Result<Request, ParseError> {
    let mut tokens = buf
        .split(|b| b.is_ascii_whitespace())
        .filter(|t| !t.is_empty());

    let method = tokens.next().ok_or(ParseError::Empty)?;
    let path = tokens.next().ok_or(ParseError::MissingPath)?;

    Ok(Request::new(
        String::from_utf8_lossy(method),
        String::from_utf8_lossy(path),
    ))
}
