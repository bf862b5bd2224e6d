pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod habits;
pub mod server;
pub mod state;
pub mod users;

pub use app::build_app;
pub use config::AppConfig;
pub use server::Server;
pub use state::AppState;
