pub mod core;
pub mod outcome;
pub mod stats_models;

pub use self::core::*;
pub use self::outcome::*;
pub use self::stats_models::*;
