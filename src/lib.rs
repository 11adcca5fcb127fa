pub mod auth;
pub mod config;
pub mod dto;
pub mod errors;
pub mod fixtures;
pub mod models;
pub mod routes;
pub mod states;
pub mod store;
pub mod templates;

pub use config::Config;
pub use routes::router;
pub use states::AppState;
pub use store::Store;
