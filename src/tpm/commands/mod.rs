pub mod commands;
pub mod extend;
