pub mod columns;
pub mod constants;
pub mod engine_config;
pub mod env;
pub mod output_paths;
pub mod progress_bars;
pub mod sampling;
