use crate::device::errors::DeviceIoError;
use crate::tpm::types::tcg;
use std::error::Error;
use std::fmt;

// SerializationError indicates an error while serializing a TPM command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializationError {
    pub msg: String,
}

impl Error for SerializationError {}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SerializationError: {}", self.msg)
    }
}

// DeserializationError indicates an error while deserializing a TPM response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeserializationError {
    pub msg: String,
}

impl Error for DeserializationError {}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DeserializationError: {}", self.msg)
    }
}

// TransportError is an error raised while running a command towards the TPM
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Device(#[from] DeviceIoError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    /// Non-zero status returned by the TCG firmware call
    #[error("TPM call failed with status {0:#06x}")]
    Status(tcg::TcgStatus),
}

impl TransportError {
    // status returns the opaque firmware code, if the failure carries one
    pub fn status(&self) -> Option<u32> {
        match self {
            TransportError::Status(status) => Some(u32::from(*status)),
            _ => None,
        }
    }
}
