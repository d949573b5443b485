//! Measure a boot artifact into a TPM PCR through the TCG BIOS interface.

#[macro_use]
extern crate mem_macros;

pub mod artifact;
pub mod command;
pub mod config;
pub mod device;
pub mod hasher;
pub mod tpm;
