pub mod driver;
pub mod errors;
pub mod raw;
pub mod sim;
pub mod tcp;
