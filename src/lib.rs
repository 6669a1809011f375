//! RAG API - Collection management, semantic retrieval and answer synthesis
//!
//! Library modules for the HTTP server

pub mod api;
pub mod config;
pub mod embeddings;
pub mod monitoring;
pub mod synthesis;
pub mod vector_store;
