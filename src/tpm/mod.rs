pub mod commands;
pub mod errors;
pub mod serialization;
pub mod transport;
pub mod types;
