pub mod client;

pub use client::EmbeddingsClient;

use anyhow::Result;

/// One embedding-service call: one text in, one vector out. The pipeline
/// owns retry and status side-effects; implementations perform a single
/// attempt.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
