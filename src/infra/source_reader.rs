use async_trait::async_trait;
use tracing::{debug, info};

use crate::app::ports::{HttpClientPort, SourceReaderPort};
use crate::error::{EnrichError, Result};
use crate::pipeline::ingestion::{resolve_sheet_link, SourceRef};

/// Reads local files from disk and fetches shared links over HTTP.
pub struct DefaultSourceReader {
    http: Box<dyn HttpClientPort>,
}

impl DefaultSourceReader {
    pub fn new(http: Box<dyn HttpClientPort>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceReaderPort for DefaultSourceReader {
    async fn read(&self, source: &SourceRef) -> Result<Vec<u8>> {
        match source {
            SourceRef::File(path) => {
                debug!(path = %path.display(), "Reading source file");
                Ok(tokio::fs::read(path).await?)
            }
            SourceRef::Link(url) => {
                let download = resolve_sheet_link(url);
                info!(url = %url, download = %download, "Fetching shared link");
                let resp = self.http.get(&download).await?;
                if !(200..300).contains(&resp.status) {
                    return Err(EnrichError::HttpStatus { status: resp.status, url: download });
                }
                debug!(content_type = %resp.content_type, bytes = resp.bytes.len(), "Fetched shared link");
                Ok(resp.bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::HttpGetResult;
    use std::io::Write;
    use std::sync::Arc;

    struct MockHttp {
        status: u16,
        requested: Arc<tokio::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl HttpClientPort for MockHttp {
        async fn get(&self, url: &str) -> Result<HttpGetResult> {
            self.requested.lock().await.push(url.to_string());
            Ok(HttpGetResult {
                status: self.status,
                bytes: b"APN,City\n1,Reno\n".to_vec(),
                content_type: "text/csv".to_string(),
            })
        }
    }

    fn reader(status: u16) -> (DefaultSourceReader, Arc<tokio::sync::Mutex<Vec<String>>>) {
        let requested = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let http = MockHttp { status, requested: requested.clone() };
        (DefaultSourceReader::new(Box::new(http)), requested)
    }

    #[tokio::test]
    async fn test_reads_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"APN\n1\n").unwrap();
        let (reader, requested) = reader(200);

        let bytes = reader.read(&SourceRef::File(file.path().to_path_buf())).await.unwrap();
        assert_eq!(bytes, b"APN\n1\n");
        assert!(requested.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_sheet_links_fetch_csv_export() {
        let (reader, requested) = reader(200);
        let link = SourceRef::Link("https://docs.google.com/spreadsheets/d/abc/edit#gid=7".to_string());

        let bytes = reader.read(&link).await.unwrap();
        assert!(bytes.starts_with(b"APN"));
        assert_eq!(
            requested.lock().await.as_slice(),
            ["https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=7"]
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (reader, _) = reader(404);
        let err = reader.read(&SourceRef::Link("https://example.com/x.csv".to_string())).await.unwrap_err();
        assert!(matches!(err, EnrichError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let (reader, _) = reader(200);
        let err = reader.read(&SourceRef::File("/nonexistent/leads.csv".into())).await.unwrap_err();
        assert!(matches!(err, EnrichError::Io(_)));
    }
}
