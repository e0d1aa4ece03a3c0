//! Tumbuh LLM - Provider ports and adapters
//!
//! This crate defines the ports for environmental variable collection, crop
//! recommendation and hyperlocal insights, along with the Gemini and HTTP
//! adapter implementations.

pub mod gemini;
pub mod ports;
pub mod response;
pub mod setup;
pub mod variables;

// Re-export main types
pub use gemini::{GeminiClient, GeminiCropAdvisor, GeminiInsightProvider};
pub use ports::{InsightProvider, Recommender, VariableProvider};
pub use setup::Providers;
pub use variables::{CategorySource, CompositeVariableProvider, DateWindow, HttpCategorySource};
