pub mod brush;
pub mod compositor;
pub mod config;
pub mod editor;
pub mod error;
pub mod gesture;
pub mod gpu;
pub mod history;
pub mod ingest;
pub mod input;
pub mod jobs;
pub mod mask;
pub mod outbox;
pub mod service;
pub mod session;
pub mod tasks;
pub mod transform;
