use crate::command::PcrPolicy;
use crate::device::raw::DEFAULT_TPM_DEVICE;
use crate::device::tcp::DEFAULT_TPM_ADDRESS;
use crate::hasher::DEFAULT_CHUNK_SIZE;
use crate::tpm::types::tcg;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("PCR range {first}-{last} is empty")]
    EmptyPcrRange { first: u32, last: u32 },
    #[error("PCR {0} is outside the TPM's PCR bank")]
    PcrOutOfBank(u32),
    #[error("chunk size must be at least one byte")]
    ZeroChunkSize,
    #[error("chunk size {0} exceeds the 1 MiB limit")]
    ChunkTooLarge(usize),
}

// Which PlatformTpmDriver carries the TCG calls
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DeviceKind {
    /// Linux TPM character device
    Raw,
    /// TPM command stream over TCP
    Socket,
    /// In-process software PCR bank
    Sim,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pcr_policy: PcrPolicy,
    pub acquire_timeout: Duration,
    pub chunk_size: usize,
    pub device: DeviceKind,
    pub device_path: PathBuf,
    pub address: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pcr_policy: PcrPolicy::default(),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            device: DeviceKind::Raw,
            device_path: PathBuf::from(DEFAULT_TPM_DEVICE),
            address: DEFAULT_TPM_ADDRESS.to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (first, last) = (self.pcr_policy.first(), self.pcr_policy.last());
        if first > last {
            return Err(ConfigError::EmptyPcrRange { first, last });
        }
        if last >= tcg::TPM_NUM_PCR {
            return Err(ConfigError::PcrOutOfBank(last));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkTooLarge(self.chunk_size));
        }
        Ok(())
    }
}
