//! FAQ retrieval behind a similarity-search boundary.
//!
//! [`FaqSearch`] is all the FAQ tool relies on. [`EmbeddingFaqIndex`] is an
//! in-memory implementation over vectors produced by an [`Embedder`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AgentsError, Collaborator, Result};

const BUILTIN_FAQS: &str = include_str!("../data/faqs.json");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
}

impl SimilarityMetric {
    /// Higher is closer for every metric.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityMetric::Cosine => {
                let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
                let denom = norm(a) * norm(b);
                if denom == 0.0 {
                    0.0
                } else {
                    dot(a, b) / denom
                }
            }
            SimilarityMetric::DotProduct => dot(a, b),
            SimilarityMetric::Euclidean => -a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqHit {
    pub id: u64,
    pub question: String,
    pub answer: String,
    pub score: f32,
}

#[async_trait]
pub trait FaqSearch: Send + Sync {
    /// Best `limit` matches for `query`, closest first.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        metric: SimilarityMetric,
    ) -> Result<Vec<FaqHit>>;
}

/// Turns text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// [`Embedder`] backed by the OpenAI embeddings endpoint.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
        }
    }

    pub fn with_client(client: Client<OpenAIConfig>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(inputs.to_vec())
            .build()?;
        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| AgentsError::unavailable(Collaborator::SimilaritySearch, e))?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

/// A stored question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: u64,
    pub question: String,
    pub answer: String,
}

#[derive(Deserialize)]
struct RawEntry {
    q: String,
    a: String,
}

/// Parse `{"<id>": {"q": "...", "a": "..."}}`.
pub fn parse_faqs(raw: &str) -> Result<Vec<FaqEntry>> {
    let parsed: BTreeMap<String, RawEntry> = serde_json::from_str(raw)?;
    let mut entries = parsed
        .into_iter()
        .map(|(id, entry)| {
            let id = id
                .trim()
                .parse::<u64>()
                .map_err(|e| AgentsError::Configuration(format!("faq id '{id}': {e}")))?;
            Ok(FaqEntry {
                id,
                question: entry.q,
                answer: entry.a,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.id);
    Ok(entries)
}

pub fn builtin_faqs() -> Result<Vec<FaqEntry>> {
    parse_faqs(BUILTIN_FAQS)
}

pub fn load_faqs(path: impl AsRef<Path>) -> Result<Vec<FaqEntry>> {
    parse_faqs(&std::fs::read_to_string(path)?)
}

/// In-memory vector index over FAQ questions.
pub struct EmbeddingFaqIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<(FaqEntry, Vec<f32>)>,
}

impl EmbeddingFaqIndex {
    /// Embed every question once and keep the vectors.
    pub async fn build(embedder: Arc<dyn Embedder>, entries: Vec<FaqEntry>) -> Result<Self> {
        let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();
        let vectors = if questions.is_empty() {
            Vec::new()
        } else {
            embedder.embed(&questions).await?
        };
        if vectors.len() != entries.len() {
            return Err(AgentsError::unavailable(
                Collaborator::SimilaritySearch,
                format!(
                    "embedded {} of {} FAQ questions",
                    vectors.len(),
                    entries.len()
                ),
            ));
        }
        info!(entries = entries.len(), "FAQ index built");
        Ok(Self {
            embedder,
            entries: entries.into_iter().zip(vectors).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl FaqSearch for EmbeddingFaqIndex {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        metric: SimilarityMetric,
    ) -> Result<Vec<FaqHit>> {
        let query_vec = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AgentsError::unavailable(Collaborator::SimilaritySearch, "empty query embedding")
            })?;

        let mut hits: Vec<FaqHit> = self
            .entries
            .iter()
            .map(|(entry, vector)| FaqHit {
                id: entry.id,
                question: entry.question.clone(),
                answer: entry.answer.clone(),
                score: metric.score(&query_vec, vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        debug!(query, hits = hits.len(), "FAQ search");
        Ok(hits)
    }
}
