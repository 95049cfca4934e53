use reqwest::{Client, header};
use std::sync::Arc;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// Status and raw body of a GET. Status is not checked here, callers decide
/// what a failure means for them.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First `max` characters of the body, for error messages.
    pub fn body_preview(&self, max: usize) -> String {
        String::from_utf8_lossy(&self.body).chars().take(max).collect()
    }
}

/// Anything able to GET a URL.
#[async_trait::async_trait]
pub trait HttpSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error>;
}

#[async_trait::async_trait]
impl<T: HttpSource + ?Sized> HttpSource for &T {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        (**self).get(url).await
    }
}

#[async_trait::async_trait]
impl<T: HttpSource + ?Sized> HttpSource for Arc<T> {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        (**self).get(url).await
    }
}

pub struct ReqwestSource {
    client: Client,
}

impl ReqwestSource {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpSource for ReqwestSource {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let resp = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json,text/javascript,*/*;q=0.1")
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        tracing::debug!(url, status, bytes = body.len(), "GET");
        Ok(HttpResponse { status, body })
    }
}
