pub mod codec;
pub mod constants;
pub mod engine;
pub mod rng;
pub mod score_store;
pub mod server_protocol;
pub mod types;
pub mod world;
