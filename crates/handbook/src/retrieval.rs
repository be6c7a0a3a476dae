//! Vector store access for retrieval-augmented answering.
//!
//! The store holds handbook chunks with their embeddings. Queries are
//! embedded through the configured provider, then matched server-side by a
//! stored similarity function.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::RetrievalError;
use crate::providers::base::Provider;

/// A stored chunk returned by a similarity query, most similar first.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DocumentMatch {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// Read/write access to the document store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The `k` stored chunks closest to `query`. Fewer than `k` results is
    /// not an error; an empty store yields an empty list.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<DocumentMatch>, RetrievalError>;

    /// Embed and persist a batch of chunks. Returns the number stored.
    async fn add_documents(&self, chunks: &[String]) -> Result<usize, RetrievalError>;
}

/// Join retrieved chunks into the context block of a grounded prompt.
pub fn build_context(matches: &[DocumentMatch]) -> String {
    matches
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Supabase project base URL, without a trailing slash.
    pub host: String,
    pub api_key: String,
    /// Table holding `content` and `embedding` columns.
    pub table: String,
    /// Stored procedure performing the similarity match.
    pub query_fn: String,
}

/// A Supabase-backed store. Rows are inserted through PostgREST and matched
/// through an RPC similarity function over pgvector.
pub struct SupabaseVectorStore {
    client: Client,
    config: VectorStoreConfig,
    embedder: Arc<dyn Provider>,
}

#[derive(Deserialize)]
struct MatchRow {
    content: String,
    #[serde(default)]
    similarity: Option<f32>,
}

impl SupabaseVectorStore {
    pub fn new(
        config: VectorStoreConfig,
        embedder: Arc<dyn Provider>,
    ) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()
            .map_err(RetrievalError::Request)?;

        Ok(Self {
            client,
            config,
            embedder,
        })
    }

    fn rest_url(&self, suffix: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.host.trim_end_matches('/'),
            suffix
        )
    }

    async fn post(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<reqwest::Response, RetrievalError> {
        let response = self
            .client
            .post(url)
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut vectors = self.embedder.embed(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(RetrievalError::EmptyEmbedding);
        }
        Ok(vectors.remove(0))
    }
}

#[async_trait]
impl VectorStore for SupabaseVectorStore {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<DocumentMatch>, RetrievalError> {
        let embedding = self.embed_one(query).await?;

        let url = self.rest_url(&format!("rpc/{}", self.config.query_fn));
        let payload = json!({
            "query_embedding": embedding,
            "match_count": k,
        });

        let response = self.post(&url, &payload).await?;
        let rows: Vec<MatchRow> = response
            .json()
            .await
            .map_err(RetrievalError::Request)?;

        Ok(rows
            .into_iter()
            .map(|row| DocumentMatch {
                content: row.content,
                similarity: row.similarity,
            })
            .collect())
    }

    async fn add_documents(&self, chunks: &[String]) -> Result<usize, RetrievalError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed(chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(RetrievalError::EmptyEmbedding);
        }

        let rows: Vec<serde_json::Value> = chunks
            .iter()
            .zip(embeddings)
            .map(|(content, embedding)| {
                json!({
                    "content": content,
                    "embedding": embedding,
                })
            })
            .collect();

        let url = self.rest_url(&self.config.table);
        self.post(&url, &json!(rows)).await?;

        Ok(chunks.len())
    }
}
