//! Video link enrichment library - matching engine and retrieval pipeline.

pub mod catalog;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod retry;
pub mod scoring;
pub mod youtube;
