pub mod app_state;
pub mod backends;
pub mod configuration;
pub mod http;
