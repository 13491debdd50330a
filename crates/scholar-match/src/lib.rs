pub mod assist;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod portal;
pub mod telemetry;
