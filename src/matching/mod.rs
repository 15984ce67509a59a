pub mod fuzzy;
pub mod geo_index;
pub mod text;
pub mod token;
