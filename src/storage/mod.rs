pub mod checkpoint;
pub mod table;
