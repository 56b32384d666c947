use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use super::document::{DocumentKind, FetchedDocument};
use super::pdf::{self, MAX_PDF_PAGES};
use super::ssrf::{HostPolicy, SystemResolver, redact_url_credentials};
use super::{ContentExtractor, Downloaded, FetchError, download, html, read_response};
use crate::cache::TtlCache;
use crate::config::ApiKey;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const BROWSERLESS_BASE: &str = "https://production-sfo.browserless.io";

pub type ContentCache = TtlCache<String, FetchedDocument>;

/// Headless-browser rendering service used for HTML pages instead of a plain GET,
/// so pages that build their content with JavaScript still yield text.
#[derive(Clone, Debug)]
pub struct RenderBackend {
    base_url: String,
    api_key: ApiKey,
}

impl RenderBackend {
    pub fn browserless(api_key: ApiKey) -> Self {
        Self {
            base_url: BROWSERLESS_BASE.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn fetch(&self, http: &Client, url: &Url) -> Result<Downloaded, FetchError> {
        let endpoint = Url::parse_with_params(
            &format!("{}/content", self.base_url),
            &[("token", self.api_key.expose())],
        )
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let response = http
            .post(endpoint)
            .header("User-Agent", crate::USER_AGENT)
            .json(&serde_json::json!({ "url": url.as_str() }))
            .send()
            .await?;

        let mut downloaded = read_response(response).await?;
        downloaded.final_url = url.to_string();
        Ok(downloaded)
    }
}

/// Production extractor: plain HTTP (or a render backend) for pages, direct
/// download for PDFs. Page results are cached by URL.
pub struct WebExtractor {
    http: Client,
    cache: Arc<ContentCache>,
    timeout: Duration,
    policy: HostPolicy,
    render: Option<RenderBackend>,
}

impl WebExtractor {
    pub fn new(http: Client, cache: Arc<ContentCache>) -> Self {
        Self {
            http,
            cache,
            timeout: DEFAULT_TIMEOUT,
            policy: HostPolicy::default(),
            render: None,
        }
    }

    /// Per-call budget covering DNS check, download and parsing.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: HostPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_render_backend(mut self, render: Option<RenderBackend>) -> Self {
        self.render = render;
        self
    }

    async fn extract_uncached(
        &self,
        url: &Url,
        kind: DocumentKind,
    ) -> Result<Option<FetchedDocument>, FetchError> {
        self.policy.check_resolved(url, &SystemResolver).await?;

        match kind {
            DocumentKind::Webpage => {
                let downloaded = match &self.render {
                    Some(render) => render.fetch(&self.http, url).await?,
                    None => download(&self.http, url.as_str()).await?,
                };
                self.revalidate(url, &downloaded.final_url).await?;

                let html = html::decode_body(&downloaded.body, downloaded.content_type.as_deref());
                let page = html::extract_text(&html)?;
                debug!(url = %redact_url_credentials(url.as_str()), bytes = downloaded.body.len(), "page fetched");
                Ok(FetchedDocument::new(url, page.title, kind, &page.text))
            }
            DocumentKind::Pdf => {
                let downloaded = download(&self.http, url.as_str()).await?;
                self.revalidate(url, &downloaded.final_url).await?;

                let body = downloaded.body;
                let text = tokio::task::spawn_blocking(move || pdf::extract_text(&body, MAX_PDF_PAGES))
                    .await
                    .map_err(|e| FetchError::ParseFailure(format!("PDF worker: {e}")))??;
                debug!(url = %redact_url_credentials(url.as_str()), chars = text.len(), "pdf fetched");
                Ok(FetchedDocument::new(url, None, kind, &text))
            }
        }
    }

    /// Re-checks the URL a redirect chain ended on.
    async fn revalidate(&self, requested: &Url, final_url: &str) -> Result<(), FetchError> {
        if final_url == requested.as_str() {
            return Ok(());
        }
        let landed = self.policy.check_url(final_url)?;
        self.policy.check_resolved(&landed, &SystemResolver).await
    }
}

impl ContentExtractor for WebExtractor {
    async fn extract(&self, url: &str) -> Result<Option<FetchedDocument>, FetchError> {
        // Malformed or disallowed URLs fail here, before any network call.
        let parsed = self.policy.check_url(url)?;
        let kind = DocumentKind::from_url(&parsed);
        let key = parsed.to_string();

        if kind == DocumentKind::Webpage
            && let Some(hit) = self.cache.get(&key)
        {
            debug!(url = %redact_url_credentials(&key), "content cache hit");
            return Ok(Some(hit));
        }

        let document = tokio::time::timeout(self.timeout, self.extract_uncached(&parsed, kind))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        if kind == DocumentKind::Webpage
            && let Some(doc) = &document
        {
            self.cache.insert(key, doc.clone());
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::pdf::tests::sample_pdf;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><head><title>Renew Passport</title></head>
        <body><h1>Passport renewal</h1><p>Bring your CNIC and old passport.</p></body></html>"#;

    fn extractor() -> WebExtractor {
        WebExtractor::new(Client::new(), Arc::new(TtlCache::new(Duration::from_secs(3600))))
            .with_policy(HostPolicy::AllowPrivate)
    }

    async fn serve(server: &MockServer, at: &str, template: ResponseTemplate, times: u64) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(template)
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn extracts_webpage() {
        let server = MockServer::start().await;
        serve(&server, "/renew", ResponseTemplate::new(200).set_body_string(PAGE), 1).await;

        let url = format!("{}/renew", server.uri());
        let doc = extractor().extract(&url).await.unwrap().unwrap();

        assert_eq!(doc.kind, DocumentKind::Webpage);
        assert_eq!(doc.title, "Renew Passport");
        assert_eq!(doc.url, url);
        assert_eq!(doc.content, "Passport renewal Bring your CNIC and old passport.");
    }

    #[tokio::test]
    async fn second_extract_within_ttl_is_served_from_cache() {
        let server = MockServer::start().await;
        serve(&server, "/renew", ResponseTemplate::new(200).set_body_string(PAGE), 1).await;

        let extractor = extractor();
        let url = format!("{}/renew", server.uri());
        let first = extractor.extract(&url).await.unwrap().unwrap();
        let second = extractor.extract(&url).await.unwrap().unwrap();

        assert_eq!(first.content.as_bytes(), second.content.as_bytes());
    }

    #[tokio::test]
    async fn expired_cache_fetches_again() {
        let server = MockServer::start().await;
        serve(&server, "/renew", ResponseTemplate::new(200).set_body_string(PAGE), 2).await;

        let extractor = WebExtractor::new(Client::new(), Arc::new(TtlCache::new(Duration::ZERO)))
            .with_policy(HostPolicy::AllowPrivate);
        let url = format!("{}/renew", server.uri());
        extractor.extract(&url).await.unwrap();
        extractor.extract(&url).await.unwrap();
    }

    #[tokio::test]
    async fn extracts_pdf_leading_pages() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/forms/renewal.PDF",
            ResponseTemplate::new(200)
                .set_body_raw(sample_pdf(&["Application form", "Fee schedule"]), "application/pdf"),
            1,
        )
        .await;

        let url = format!("{}/forms/renewal.PDF", server.uri());
        let doc = extractor().extract(&url).await.unwrap().unwrap();

        assert_eq!(doc.kind, DocumentKind::Pdf);
        assert_eq!(doc.title, "renewal.PDF");
        assert!(doc.content.contains("Application form"), "got: {}", doc.content);
    }

    #[tokio::test]
    async fn page_is_decoded_with_declared_charset() {
        let server = MockServer::start().await;
        let body = b"<html><body><p>Caf\xe9 permit: 50 \x80</p></body></html>".to_vec();
        serve(
            &server,
            "/permit",
            ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=windows-1252"),
            1,
        )
        .await;

        let doc = extractor()
            .extract(&format!("{}/permit", server.uri()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(doc.content, "Caf\u{e9} permit: 50 \u{20ac}");
    }

    #[tokio::test]
    async fn broken_pdf_is_parse_failure() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/broken.pdf",
            ResponseTemplate::new(200).set_body_string("<html>moved</html>"),
            1,
        )
        .await;

        let result = extractor()
            .extract(&format!("{}/broken.pdf", server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::ParseFailure(_))), "got: {result:?}");
    }

    #[tokio::test]
    async fn page_without_text_is_absent() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/empty",
            ResponseTemplate::new(200).set_body_string("<html><body><div>menu</div></body></html>"),
            1,
        )
        .await;

        let result = extractor()
            .extract(&format!("{}/empty", server.uri()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn malformed_url_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for url in ["", "not a url", "ftp://files.example.gov/form.pdf"] {
            let result = extractor().extract(url).await;
            assert!(
                matches!(
                    result,
                    Err(FetchError::InvalidUrl(_)) | Err(FetchError::InvalidScheme)
                ),
                "{url:?}: {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn public_only_policy_blocks_loopback() {
        let server = MockServer::start().await;
        serve(&server, "/renew", ResponseTemplate::new(200).set_body_string(PAGE), 0).await;

        let extractor = WebExtractor::new(Client::new(), Arc::new(TtlCache::new(Duration::from_secs(60))));
        let result = extractor.extract(&format!("{}/renew", server.uri())).await;
        assert!(matches!(result, Err(FetchError::InternalHost)));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/slow",
            ResponseTemplate::new(200)
                .set_body_string(PAGE)
                .set_delay(Duration::from_secs(3)),
            1,
        )
        .await;

        let extractor = extractor().with_timeout(Duration::from_millis(200));
        let result = extractor.extract(&format!("{}/slow", server.uri())).await;
        assert!(matches!(result, Err(FetchError::Timeout(_))), "got: {result:?}");
    }

    #[tokio::test]
    async fn http_error_status_is_error() {
        let server = MockServer::start().await;
        serve(&server, "/gone", ResponseTemplate::new(410), 1).await;

        let result = extractor().extract(&format!("{}/gone", server.uri())).await;
        assert!(matches!(result, Err(FetchError::Status(410))));
    }

    #[tokio::test]
    async fn render_backend_fetches_pages() {
        let render = MockServer::start().await;
        let origin = "https://www.dgip.gov.pk/renewal";
        Mock::given(method("POST"))
            .and(path("/content"))
            .and(query_param("token", "render-key"))
            .and(body_json(serde_json::json!({ "url": origin })))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&render)
            .await;

        let backend = RenderBackend::browserless(ApiKey::new("render-key").unwrap())
            .with_base_url(&render.uri());
        let doc = extractor()
            .with_render_backend(Some(backend))
            .extract(origin)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(doc.url, origin);
        assert_eq!(doc.title, "Renew Passport");
    }
}
