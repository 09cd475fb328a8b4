pub mod document;
pub mod search_config;
