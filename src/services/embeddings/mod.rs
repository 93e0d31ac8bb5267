/// Text-embedding gateway abstraction
///
/// The engine only consumes embeddings as opaque dense vectors. The gateway is
/// an unreliable upstream: a whole call may fail, and within a batch each text
/// may independently come back empty.
use crate::error::AppResult;

pub mod http;

pub use http::HttpEmbeddingGateway;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Embeds every text in one upstream call
    ///
    /// The result has one slot per input text, in order; `None` marks a text
    /// the gateway could not embed.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Option<Vec<f32>>>>;

    /// Embeds a single text; any failure yields `None`
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.embed_batch(&[text.to_string()]).await {
            Ok(mut embeddings) => embeddings.pop().flatten(),
            Err(e) => {
                tracing::warn!(error = %e, gateway = self.name(), "Embedding request failed");
                None
            }
        }
    }

    /// Gateway name for logging
    fn name(&self) -> &'static str;
}
