//! Middleware run ahead of the route handlers.

pub mod pipeline;

pub use pipeline::{request_pipeline, PipelineState};
