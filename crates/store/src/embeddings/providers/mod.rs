//! Concrete embedding providers.

pub mod ollama;
pub mod openai;
pub mod trigram;

pub use ollama::OllamaEmbeddings;
pub use openai::OpenAiEmbeddings;
pub use trigram::TrigramEmbeddings;
