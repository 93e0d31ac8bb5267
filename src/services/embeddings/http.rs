/// HTTP client for the text-embedding service
///
/// Request:  `POST {api_url}/embed` with `{"texts": [..]}`
/// Response: `{"embeddings": [[f32, ..] | null, ..]}`, one slot per text
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    services::embeddings::EmbeddingGateway,
};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Option<Vec<f32>>>,
}

#[derive(Clone)]
pub struct HttpEmbeddingGateway {
    http_client: HttpClient,
    api_url: String,
    api_key: Option<String>,
}

impl HttpEmbeddingGateway {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Checks the response shape and blanks out empty vectors
    fn parse_response(
        &self,
        response: EmbedResponse,
        expected: usize,
    ) -> AppResult<Vec<Option<Vec<f32>>>> {
        if response.embeddings.len() != expected {
            return Err(AppError::Embedding(format!(
                "Gateway returned {} embeddings for {} texts",
                response.embeddings.len(),
                expected
            )));
        }

        Ok(response
            .embeddings
            .into_iter()
            .map(|embedding| embedding.filter(|values| !values.is_empty()))
            .collect())
    }
}

#[async_trait::async_trait]
impl EmbeddingGateway for HttpEmbeddingGateway {
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Option<Vec<f32>>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embed", self.api_url);
        let mut request = self.http_client.post(&url).json(&EmbedRequest { texts });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "Embedding gateway request failed"
            );
            return Err(AppError::Embedding(format!(
                "Gateway returned status {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        let embeddings = self.parse_response(parsed, texts.len())?;

        tracing::debug!(
            requested = texts.len(),
            embedded = embeddings.iter().filter(|e| e.is_some()).count(),
            "Embedding batch completed"
        );

        Ok(embeddings)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
