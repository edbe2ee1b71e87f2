// Library exports for chirp-server
// The admin CLI and the integration tests drive the engine through these

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod state;
