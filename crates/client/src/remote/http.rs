//! Document store REST client.
//!
//! Uses `reqwest` for HTTP with a bearer API key.
//! Caches product pages using `moka` (TTL from configuration).

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use shopnow_core::{CartDocument, PageRequest, ProductPage, UserId};
use tracing::{debug, instrument};
use url::Url;

use super::cache::PageKey;
use super::conversions::{
    Document, DocumentList, ProductFields, WriteDocument, convert_cart, convert_product_page,
};
use super::{CartDocuments, ProductCatalog, RemoteError};
use crate::config::BackendConfig;

/// How much of an error body is kept for logs and error values.
const BODY_PREVIEW_CHARS: usize = 200;

/// How a `404 Not Found` answer is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotFound {
    /// The document does not exist; reported as `Ok(None)`.
    Absent,
    /// The target is missing; reported as a status error.
    Fail,
}

// =============================================================================
// DocumentStoreClient
// =============================================================================

/// Client for the remote document store.
///
/// Provides the product catalog and per-user cart documents.
/// Product pages are cached; cart documents are always read fresh.
#[derive(Clone)]
pub struct DocumentStoreClient {
    inner: Arc<DocumentStoreClientInner>,
}

struct DocumentStoreClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    products_collection: String,
    carts_collection: String,
    cache: Cache<PageKey, ProductPage>,
}

impl DocumentStoreClient {
    /// Create a new document store client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// cannot carry path segments.
    pub fn new(config: &BackendConfig) -> Result<Self, RemoteError> {
        if config.base_url.cannot_be_a_base() {
            return Err(RemoteError::Unavailable(format!(
                "base URL cannot carry a path: {}",
                config.base_url
            )));
        }

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(DocumentStoreClientInner {
                client,
                base_url: config.base_url.clone(),
                api_key: config.api_key.expose_secret().to_string(),
                products_collection: config.products_collection.clone(),
                carts_collection: config.carts_collection.clone(),
                cache,
            }),
        })
    }

    /// URL of a collection's documents, or of one document when `key` is set.
    fn documents_url(&self, collection: &str, key: Option<&str>) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "collections", collection, "documents"]);
            if let Some(key) = key {
                segments.push(key);
            }
        }
        url
    }

    /// Send a request and decode the JSON body.
    ///
    /// Returns `Ok(None)` for an empty body, and for `404 Not Found` when
    /// `not_found` is [`NotFound::Absent`].
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        not_found: NotFound,
    ) -> Result<Option<T>, RemoteError> {
        let response = request
            .bearer_auth(&self.inner.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(RemoteError::RateLimited(retry_after));
        }

        if status == StatusCode::NOT_FOUND && not_found == NotFound::Absent {
            return Ok(None);
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let body = response_text.chars().take(BODY_PREVIEW_CHARS).collect::<String>();
            tracing::error!(
                status = %status,
                body = %body,
                "Document store returned non-success status"
            );
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Writes may answer with an empty body
        if response_text.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&response_text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(BODY_PREVIEW_CHARS).collect::<String>(),
                    "Failed to parse document store response"
                );
                Err(RemoteError::Parse(e))
            }
        }
    }
}

#[async_trait]
impl ProductCatalog for DocumentStoreClient {
    #[instrument(skip(self, request), fields(limit = request.limit, after = ?request.after))]
    async fn fetch_page(&self, request: PageRequest) -> Result<ProductPage, RemoteError> {
        let cache_key = PageKey::new(&self.inner.products_collection, &request);

        if !request.fresh
            && let Some(page) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for product page");
            return Ok(page);
        }

        let mut url = self.documents_url(&self.inner.products_collection, None);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &request.limit.to_string());
            if let Some(cursor) = &request.after {
                query.append_pair("start_after", cursor.as_str());
            }
        }

        let list = self
            .execute::<DocumentList<ProductFields>>(self.inner.client.get(url), NotFound::Absent)
            .await?
            .ok_or_else(|| RemoteError::Unavailable(format!(
                "collection {} not found",
                self.inner.products_collection
            )))?;

        let page = convert_product_page(list)?;

        self.inner.cache.insert(cache_key, page.clone()).await;

        Ok(page)
    }
}

#[async_trait]
impl CartDocuments for DocumentStoreClient {
    #[instrument(skip(self, user), fields(user = %user))]
    async fn read_cart(&self, user: &UserId) -> Result<Option<CartDocument>, RemoteError> {
        let url = self.documents_url(&self.inner.carts_collection, Some(user.as_str()));

        let document = self
            .execute::<Document<CartDocument>>(self.inner.client.get(url), NotFound::Absent)
            .await?;

        Ok(document.map(convert_cart))
    }

    #[instrument(skip(self, user, document), fields(user = %user, items = document.items.len()))]
    async fn write_cart(&self, user: &UserId, document: &CartDocument) -> Result<(), RemoteError> {
        let url = self.documents_url(&self.inner.carts_collection, Some(user.as_str()));

        self.execute::<serde_json::Value>(
            self.inner
                .client
                .put(url)
                .json(&WriteDocument { data: document }),
            NotFound::Fail,
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use secrecy::SecretString;
    use shopnow_core::CartItem;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    const API_KEY: &str = "k3Y!x9QvL2#pR7zM4@tW8";

    /// A canned HTTP response.
    struct Reply {
        status: &'static str,
        headers: &'static str,
        body: String,
    }

    impl Reply {
        fn new(status: &'static str, body: impl Into<String>) -> Self {
            Self {
                status,
                headers: "",
                body: body.into(),
            }
        }
    }

    /// A request as the stub server received it.
    #[derive(Debug, Clone)]
    struct Received {
        line: String,
        head: String,
        body: String,
    }

    /// Serve `replies` in order, one connection each, then stop listening.
    async fn serve(replies: Vec<Reply>) -> (String, Arc<Mutex<Vec<Received>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        tokio::spawn(async move {
            for reply in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                log.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
                    reply.status,
                    reply.body.len(),
                    reply.headers,
                    reply.body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });

        (base, received)
    }

    async fn read_request(stream: &mut TcpStream) -> Received {
        let mut raw = Vec::new();
        let mut chunk = [0_u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            raw.extend_from_slice(&chunk[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
            assert!(n > 0, "connection closed before headers ended");
        };

        let head = String::from_utf8_lossy(&raw[..head_end]).to_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map_or(0, |v| v.trim().parse::<usize>().unwrap());
        while raw.len() < head_end + 4 + length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body ended");
            raw.extend_from_slice(&chunk[..n]);
        }

        let line = String::from_utf8_lossy(&raw[..head_end])
            .lines()
            .next()
            .unwrap()
            .to_string();
        let body = String::from_utf8_lossy(&raw[head_end + 4..]).to_string();
        Received { line, head, body }
    }

    fn products_body(name: &str) -> String {
        format!(r#"{{"documents":[{{"id":"p1","data":{{"name":"{name}","price":45}}}}]}}"#)
    }

    fn user() -> UserId {
        UserId::parse("u1").unwrap()
    }

    fn client_for(base: &str) -> DocumentStoreClient {
        DocumentStoreClient::new(&BackendConfig {
            base_url: Url::parse(base).unwrap(),
            api_key: SecretString::from(API_KEY),
            products_collection: "products".to_string(),
            carts_collection: "carts".to_string(),
            cache_ttl: Duration::from_secs(300),
            http_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_collection_url() {
        let client = client_for("https://store.example.test");
        assert_eq!(
            client.documents_url("products", None).as_str(),
            "https://store.example.test/v1/collections/products/documents"
        );
    }

    #[test]
    fn test_document_url_with_base_path() {
        let client = client_for("https://example.test/api/");
        assert_eq!(
            client.documents_url("carts", Some("uid-1")).as_str(),
            "https://example.test/api/v1/collections/carts/documents/uid-1"
        );
    }

    #[test]
    fn test_document_key_is_escaped() {
        let client = client_for("https://store.example.test");
        let url = client.documents_url("carts", Some("a b"));
        assert!(url.as_str().ends_with("/documents/a%20b"));
    }

    #[test]
    fn test_rejects_non_base_url() {
        let result = DocumentStoreClient::new(&BackendConfig {
            base_url: Url::parse("mailto:shop@example.test").unwrap(),
            api_key: SecretString::from(API_KEY),
            products_collection: "products".to_string(),
            carts_collection: "carts".to_string(),
            cache_ttl: Duration::from_secs(300),
            http_timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_cart_document_reads_as_none() {
        let (base, received) = serve(vec![Reply::new("404 Not Found", "")]).await;
        let client = client_for(&base);

        assert!(client.read_cart(&user()).await.unwrap().is_none());
        let requests = received.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].line.starts_with("GET /v1/collections/carts/documents/u1 "));
    }

    #[tokio::test]
    async fn test_stored_cart_document_is_decoded() {
        let body = r#"{"id":"u1","data":{"items":[{"id":"p1","name":"Lip Balm","price":45}]}}"#;
        let (base, _) = serve(vec![Reply::new("200 OK", body)]).await;
        let client = client_for(&base);

        let document = client.read_cart(&user()).await.unwrap().unwrap();
        assert_eq!(document.items.len(), 1);
        assert_eq!(document.items[0].name, "Lip Balm");
    }

    #[tokio::test]
    async fn test_cart_write_to_missing_target_fails() {
        let (base, _) = serve(vec![Reply::new("404 Not Found", "no such collection")]).await;
        let client = client_for(&base);

        let result = client.write_cart(&user(), &CartDocument::default()).await;
        assert!(matches!(
            result,
            Err(RemoteError::Status { status: 404, ref body }) if body == "no such collection"
        ));
    }

    #[tokio::test]
    async fn test_cart_write_accepts_empty_body() {
        let (base, received) = serve(vec![Reply::new("200 OK", "")]).await;
        let client = client_for(&base);
        let document = CartDocument::new(vec![CartItem {
            id: shopnow_core::ProductId::parse("p1").unwrap(),
            name: "Lip Balm".to_string(),
            price: rust_decimal::Decimal::from(45),
            image: None,
        }]);

        client.write_cart(&user(), &document).await.unwrap();

        let requests = received.lock().unwrap().clone();
        assert!(requests[0].line.starts_with("PUT /v1/collections/carts/documents/u1 "));
        assert!(requests[0].head.contains(&format!("authorization: bearer {}", API_KEY.to_lowercase())));
        let sent: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent["data"]["items"][0]["id"], "p1");
    }

    #[tokio::test]
    async fn test_rate_limit_reports_retry_after() {
        let reply = Reply {
            status: "429 Too Many Requests",
            headers: "Retry-After: 7\r\n",
            body: String::new(),
        };
        let (base, _) = serve(vec![reply]).await;
        let client = client_for(&base);

        let result = client.read_cart(&user()).await;
        assert!(matches!(result, Err(RemoteError::RateLimited(7))));
    }

    #[tokio::test]
    async fn test_error_status_keeps_truncated_body() {
        let (base, _) = serve(vec![Reply::new("500 Internal Server Error", "x".repeat(500))]).await;
        let client = client_for(&base);

        match client.fetch_page(PageRequest::first(10)).await {
            Err(RemoteError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body.chars().count(), BODY_PREVIEW_CHARS);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_page_is_served_from_cache() {
        let (base, received) = serve(vec![Reply::new("200 OK", products_body("Lip Balm"))]).await;
        let client = client_for(&base);

        let first = client.fetch_page(PageRequest::first(2)).await.unwrap();
        let second = client.fetch_page(PageRequest::first(2)).await.unwrap();

        assert_eq!(first, second);
        let requests = received.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].line.contains("limit=2"));
    }

    #[tokio::test]
    async fn test_fresh_page_skips_cache_and_refills_it() {
        let (base, received) = serve(vec![
            Reply::new("200 OK", products_body("Lip Balm")),
            Reply::new("200 OK", products_body("Hand Cream")),
        ])
        .await;
        let client = client_for(&base);

        client.fetch_page(PageRequest::first(2)).await.unwrap();
        let fresh = client.fetch_page(PageRequest::first(2).fresh()).await.unwrap();
        assert_eq!(fresh.products.first().unwrap().name, "Hand Cream");
        assert_eq!(received.lock().unwrap().len(), 2);

        let cached = client.fetch_page(PageRequest::first(2)).await.unwrap();
        assert_eq!(cached.products.first().unwrap().name, "Hand Cream");
    }
}
