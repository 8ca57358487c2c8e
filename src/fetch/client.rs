use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam over the HTTP transport used to pull realtime feeds.
///
/// The pipeline only ever needs `execute`; tests swap in clients that fail
/// or stall to exercise the feed-absent paths.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
