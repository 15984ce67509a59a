pub mod cascade;
pub mod orchestrator;
pub mod records;
pub mod trace;

pub use orchestrator::Resolver;
