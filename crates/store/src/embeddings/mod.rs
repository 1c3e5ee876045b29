//! Embedding clients.
//!
//! The store only depends on the [`EmbeddingClient`] trait; concrete providers
//! live under [`providers`] and are selected by [`create_client`].

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_client, normalize, EmbeddingClient};
