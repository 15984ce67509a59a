pub mod matching;
pub mod models;
pub mod oracle;
pub mod resolution;
pub mod storage;
pub mod utils;
