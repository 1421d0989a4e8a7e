// Cleaning stages applied between ingestion and training

pub mod feature_filter;
pub mod remap;
pub mod stopwords;
pub mod target;
pub mod text;
pub mod validators;
