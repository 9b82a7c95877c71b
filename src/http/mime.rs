/// Fallback for paths without an extension or with an unknown one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Returns the MIME type for a path based on its last extension.
///
/// Matching is case-sensitive: `FILE.HTML` is not recognized as HTML.
///
/// # Example
///
/// ```
/// # use beacon::http::mime::content_type_for;
/// assert_eq!(content_type_for("index.html"), "text/html");
/// assert_eq!(content_type_for("a.b.json"), "application/json");
/// assert_eq!(content_type_for("noext"), "application/octet-stream");
/// ```
pub fn content_type_for(path: &str) -> &'static str {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return DEFAULT_CONTENT_TYPE;
    };

    match ext {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain",
        "xml" => "application/xml",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
