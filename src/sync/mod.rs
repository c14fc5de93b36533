pub mod api;
pub mod session;
pub mod sync_engine;
pub mod wire;
