//! The `tpm <image> <pcr>` measurement command.
//!
//! Probes for a TPM, checks the arguments, acquires the artifact, digests it
//! with SHA-1 and extends the requested PCR with the result. Every failure
//! is terminal; nothing is retried.

use crate::artifact::{ArtifactError, ArtifactSource};
use crate::config::{Config, ConfigError};
use crate::hasher::Hasher;
use crate::tpm::errors::TransportError;
use crate::tpm::transport::TpmTransportOps;
use crate::tpm::types::tcg;
use sha1::Sha1;
use std::fmt;
use std::io;
use std::time::Duration;

const ENOENT: i32 = 2;
const EIO: i32 = 5;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;
const ENOTSUP: i32 = 95;
const ETIMEDOUT: i32 = 110;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    DeviceAbsent,
    Argument,
    Acquisition,
    TpmIo,
}

#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("TPM not present")]
    DeviceAbsent,
    #[error("expected {expected} arguments, got {found}")]
    ArgumentCount { expected: usize, found: usize },
    #[error("Invalid PCR \"{0}\"")]
    InvalidPcr(String),
    #[error("Unable to acquire image: {0}")]
    Acquisition(#[source] ArtifactError),
    #[error("Unable to read image: {0}")]
    ArtifactRead(#[source] ArtifactError),
    #[error(transparent)]
    Tpm(#[from] TransportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MeasureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeasureError::DeviceAbsent => ErrorKind::DeviceAbsent,
            MeasureError::ArgumentCount { .. }
            | MeasureError::InvalidPcr(_)
            | MeasureError::Config(_) => ErrorKind::Argument,
            MeasureError::Acquisition(_) | MeasureError::ArtifactRead(_) => {
                ErrorKind::Acquisition
            }
            MeasureError::Tpm(_) => ErrorKind::TpmIo,
        }
    }

    /// Negative errno for the failure, the command's exit status.
    pub fn errno(&self) -> i32 {
        let errno = match self {
            MeasureError::DeviceAbsent => ENODEV,
            MeasureError::ArgumentCount { .. }
            | MeasureError::InvalidPcr(_)
            | MeasureError::Config(_) => EINVAL,
            MeasureError::Acquisition(err) | MeasureError::ArtifactRead(err) => match err {
                ArtifactError::NotFound(_) => ENOENT,
                ArtifactError::Timeout { .. } => ETIMEDOUT,
                ArtifactError::UnsupportedScheme(_) => ENOTSUP,
                ArtifactError::Io(e) if e.kind() == io::ErrorKind::NotFound => ENOENT,
                ArtifactError::OutOfRange { .. } | ArtifactError::Io(_) => EIO,
            },
            MeasureError::Tpm(_) => EIO,
        };
        -errno
    }
}

/// Inclusive range of PCR indices the command may extend.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PcrPolicy {
    first: tcg::TpmPcrIndex,
    last: tcg::TpmPcrIndex,
}

impl PcrPolicy {
    pub const fn new(first: tcg::TpmPcrIndex, last: tcg::TpmPcrIndex) -> Self {
        PcrPolicy { first, last }
    }

    pub fn first(&self) -> tcg::TpmPcrIndex {
        self.first
    }

    pub fn last(&self) -> tcg::TpmPcrIndex {
        self.last
    }

    pub fn contains(&self, pcr: tcg::TpmPcrIndex) -> bool {
        (self.first..=self.last).contains(&pcr)
    }

    /// Parses a decimal PCR literal: digits only, no sign, no whitespace,
    /// inside the policy range.
    pub fn parse(&self, literal: &str) -> Result<tcg::TpmPcrIndex, MeasureError> {
        let invalid = || MeasureError::InvalidPcr(literal.to_string());
        if literal.is_empty() || !literal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let pcr: tcg::TpmPcrIndex = literal.parse().map_err(|_| invalid())?;
        if !self.contains(pcr) {
            return Err(invalid());
        }
        Ok(pcr)
    }
}

/// PCRs 8-15 are left to the OS; 0-7 belong to pre-boot firmware.
impl Default for PcrPolicy {
    fn default() -> Self {
        PcrPolicy::new(8, 15)
    }
}

impl fmt::Display for PcrPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

pub struct PcrExtendCommand<'a> {
    tpm: &'a mut dyn TpmTransportOps,
    source: &'a dyn ArtifactSource,
    policy: PcrPolicy,
    timeout: Duration,
    hasher: Hasher<Sha1>,
}

impl<'a> PcrExtendCommand<'a> {
    pub fn new(
        tpm: &'a mut dyn TpmTransportOps,
        source: &'a dyn ArtifactSource,
        config: &Config,
    ) -> Self {
        PcrExtendCommand {
            tpm,
            source,
            policy: config.pcr_policy,
            timeout: config.acquire_timeout,
            hasher: Hasher::with_chunk_size(config.chunk_size),
        }
    }

    /// Runs the command with its positional arguments `<image> <pcr>`.
    pub fn execute(&mut self, args: &[&str]) -> Result<(), MeasureError> {
        if !self.tpm.is_present() {
            return Err(MeasureError::DeviceAbsent);
        }

        let (reference, pcr_literal) = match args {
            [reference, pcr] => (*reference, *pcr),
            _ => {
                return Err(MeasureError::ArgumentCount {
                    expected: 2,
                    found: args.len(),
                })
            }
        };
        let pcr = self.policy.parse(pcr_literal)?;

        let mut artifact = self
            .source
            .acquire(reference, self.timeout)
            .map_err(MeasureError::Acquisition)?;
        log::debug!("acquired {} ({} bytes)", reference, artifact.len());

        let digest: tcg::TpmDigest = self
            .hasher
            .digest(&mut *artifact)
            .map_err(MeasureError::ArtifactRead)?
            .into();

        self.tpm.extend(pcr, &digest)?;
        log::info!(
            "extended PCR {} with {} ({})",
            pcr,
            hex::encode(digest),
            reference
        );
        Ok(())
    }
}
