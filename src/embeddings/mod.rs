// Embeddings module
// Turns document and query text into vectors through an OpenAI-compatible API

pub mod openai;

pub use openai::{EmbeddingData, EmbeddingsResponse, OpenAiClient, UsageInfo};
