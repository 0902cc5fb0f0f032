use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;

use revise_core::model::{Corpus, CorpusDocument};

use crate::error::CorpusLoadError;

/// Where the course export comes from.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Human-readable location, for logs and error messages.
    fn describe(&self) -> String;

    /// Fetch the raw JSON document.
    ///
    /// # Errors
    ///
    /// Returns `CorpusLoadError` if the resource cannot be reached or read.
    async fn fetch(&self) -> Result<String, CorpusLoadError>;
}

/// Fetches the export over HTTP(S).
#[derive(Clone)]
pub struct HttpCorpusSource {
    client: Client,
    url: String,
}

impl HttpCorpusSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CorpusSource for HttpCorpusSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String, CorpusLoadError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(CorpusLoadError::HttpStatus(response.status()));
        }
        Ok(response.text().await?)
    }
}

/// Reads the export from a local file.
#[derive(Debug, Clone)]
pub struct FileCorpusSource {
    path: PathBuf,
}

impl FileCorpusSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CorpusSource for FileCorpusSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, CorpusLoadError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CorpusLoadError::Io {
                path: self.describe(),
                source,
            })
    }
}

/// Serves a document held in memory.
#[derive(Debug, Clone)]
pub struct InlineCorpusSource {
    raw: String,
}

impl InlineCorpusSource {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

#[async_trait]
impl CorpusSource for InlineCorpusSource {
    fn describe(&self) -> String {
        "inline corpus".to_string()
    }

    async fn fetch(&self) -> Result<String, CorpusLoadError> {
        Ok(self.raw.clone())
    }
}

/// Pick a source for `location`: `http(s)://` URLs go over the network, anything
/// else is a file path.
#[must_use]
pub fn corpus_source_for(location: &str) -> Box<dyn CorpusSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpCorpusSource::new(location))
    } else {
        Box::new(FileCorpusSource::new(location))
    }
}

/// Decode and flatten a course export. Definitions without a term name are skipped.
///
/// # Errors
///
/// Returns `CorpusLoadError::Parse` for malformed JSON or a document of the wrong shape.
pub fn parse_corpus(raw: &str) -> Result<Corpus, CorpusLoadError> {
    let document: CorpusDocument = serde_json::from_str(raw)?;
    Ok(Corpus::from_document(document))
}

/// Fetch and flatten the corpus from `source`.
///
/// # Errors
///
/// Returns `CorpusLoadError` if fetching or decoding fails.
pub async fn load_corpus(source: &dyn CorpusSource) -> Result<Corpus, CorpusLoadError> {
    let raw = source.fetch().await.inspect_err(|err| {
        tracing::error!(source = %source.describe(), error = %err, "corpus fetch failed");
    })?;
    let corpus = parse_corpus(&raw).inspect_err(|err| {
        tracing::error!(source = %source.describe(), error = %err, "corpus is malformed");
    })?;
    if corpus.skipped() > 0 {
        tracing::warn!(
            source = %source.describe(),
            skipped = corpus.skipped(),
            "definitions without a term name were skipped"
        );
    }
    tracing::info!(
        source = %source.describe(),
        terms = corpus.len(),
        courses = corpus.course_count(),
        "corpus loaded"
    );
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const DOC: &str = r#"{"courses": [
        ["c1", {"ue": "3.10", "title": "Micro", "definitions": [
            {"term": "Biofilm", "definition": "Communauté"},
            {"term": "Asepsie", "definition": "Absence de germes"}
        ]}]
    ]}"#;

    #[tokio::test]
    async fn inline_source_loads_terms() {
        let corpus = load_corpus(&InlineCorpusSource::new(DOC)).await.unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.terms()[0].name(), "Biofilm");
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let err = load_corpus(&InlineCorpusSource::new("{\"courses\": [")).await.unwrap_err();
        assert!(matches!(err, CorpusLoadError::Parse(_)));
    }

    #[tokio::test]
    async fn wrong_shape_is_a_parse_error() {
        let err = load_corpus(&InlineCorpusSource::new(r#"{"courses": {"a": 1}}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, CorpusLoadError::Parse(_)));
    }

    #[tokio::test]
    async fn blank_term_is_skipped_not_fatal() {
        let raw = r#"{"courses": [["c", {"ue": "3.10", "title": "Micro", "definitions": [
            {"term": "Asepsie", "definition": "Absence de germes"},
            {"term": "Biofilm", "definition": "Communauté"},
            {"term": "", "definition": "x"}
        ]}]]}"#;
        let corpus = load_corpus(&InlineCorpusSource::new(raw)).await.unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.skipped(), 1);
    }

    /// Answer a single HTTP request with `status` and `body`, then close.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/courses.json")
    }

    #[tokio::test]
    async fn http_source_loads_terms() {
        let url = serve_once("200 OK", DOC).await;
        let corpus = load_corpus(&HttpCorpusSource::new(url)).await.unwrap();
        assert_eq!(corpus.len(), 2);
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let url = serve_once("404 Not Found", "").await;
        let err = load_corpus(&HttpCorpusSource::new(url)).await.unwrap_err();
        assert!(matches!(err, CorpusLoadError::HttpStatus(StatusCode::NOT_FOUND)));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        // Grab a free port, then release it so nothing is listening there.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpCorpusSource::new(format!("http://{addr}/courses.json"));
        let err = load_corpus(&source).await.unwrap_err();
        assert!(matches!(err, CorpusLoadError::Http(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let source = FileCorpusSource::new("/definitely/not/here/courses.json");
        let err = load_corpus(&source).await.unwrap_err();
        assert!(matches!(err, CorpusLoadError::Io { .. }));
    }

    #[tokio::test]
    async fn file_source_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("revise-corpus-{}.json", std::process::id()));
        tokio::fs::write(&path, DOC).await.unwrap();

        let corpus = load_corpus(&FileCorpusSource::new(&path)).await.unwrap();
        assert_eq!(corpus.len(), 2);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[test]
    fn location_picks_source_kind() {
        assert_eq!(
            corpus_source_for("https://example.org/courses.json").describe(),
            "https://example.org/courses.json"
        );
        assert_eq!(
            corpus_source_for("data/courses.json").describe(),
            "data/courses.json"
        );
    }
}
