use std::path::PathBuf;

/// Name served for a request to `/` when nothing else is configured.
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// Prefix that makes request paths relative to the working directory.
pub const DEFAULT_ROOT_MARKER: &str = ".";

/// Represents the parts of a client request the server looks at.
///
/// Only the first two whitespace-delimited tokens of the request are kept.
/// Headers, the HTTP version and any body are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The first token (e.g. "GET"). Not validated and only used for logging.
    pub method: String,
    /// The second token (e.g. "/index.html").
    pub path: String,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

/// Maps request paths onto filesystem paths.
///
/// The mapping is purely syntactic. `..` segments are passed through as-is,
/// so a request may name files outside the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRoot {
    marker: String,
    default_document: String,
}

impl Default for DocumentRoot {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_MARKER, DEFAULT_DOCUMENT)
    }
}

impl DocumentRoot {
    pub fn new(marker: impl Into<String>, default_document: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            default_document: default_document.into(),
        }
    }

    /// Root relative to the working directory, serving `default_document` for `/`.
    pub fn with_default_document(default_document: impl Into<String>) -> Self {
        Self::new(DEFAULT_ROOT_MARKER, default_document)
    }

    pub fn default_document(&self) -> &str {
        &self.default_document
    }

    /// Resolves a request path to the file that should be served.
    ///
    /// # Example
    ///
    /// ```
    /// # use beacon::http::request::DocumentRoot;
    /// # use std::path::PathBuf;
    /// let root = DocumentRoot::default();
    /// assert_eq!(root.resolve("/"), PathBuf::from("./index.html"));
    /// assert_eq!(root.resolve("/css/site.css"), PathBuf::from("./css/site.css"));
    /// ```
    pub fn resolve(&self, path: &str) -> PathBuf {
        if path == "/" {
            PathBuf::from(&self.marker).join(&self.default_document)
        } else {
            PathBuf::from(format!("{}{}", self.marker, path))
        }
    }
}
