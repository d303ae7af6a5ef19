pub mod config;
pub mod fetch;
pub mod geo;
pub mod output;
pub mod pipeline;
pub mod series;
pub mod tracing;
