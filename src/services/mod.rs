pub mod embeddings;
pub mod engine;
pub mod features;
pub mod persona;
pub mod ranking;
pub mod recommendations;
pub mod similarity;
pub mod store;

pub use embeddings::{EmbeddingGateway, HttpEmbeddingGateway};
pub use engine::{EngineSettings, RecommendationEngine};
pub use persona::PersonaManager;
pub use ranking::RankingEngine;
pub use recommendations::ContentRecommender;
pub use store::Store;
