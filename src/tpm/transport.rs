use crate::device::driver::PlatformTpmDriver;
use crate::tpm::commands::extend::{ExtendCommand, ExtendResponse};
use crate::tpm::errors::TransportError;
use crate::tpm::types::tcg;
use std::result;

// TpmTransportOps is the TPM surface the measurement command needs
pub trait TpmTransportOps {
    // is_present probes once for a TCG BIOS interface
    fn is_present(&mut self) -> bool;
    // extend folds digest into PCR pcr_index. The index is not re-validated.
    fn extend(
        &mut self,
        pcr_index: tcg::TpmPcrIndex,
        digest: &tcg::TpmDigest,
    ) -> result::Result<(), TransportError>;
}

/// Talks to the TPM through the TCG BIOS calling convention, implemented by
/// a [`PlatformTpmDriver`].
///
/// `extend` borrows the transport mutably and builds its block on the stack,
/// so one transport never has two pass-through calls in flight.
pub struct TpmTransport<D: PlatformTpmDriver> {
    driver: D,
}

impl<D: PlatformTpmDriver> TpmTransport<D> {
    pub fn new(driver: D) -> Self {
        TpmTransport { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }
}

impl<D: PlatformTpmDriver> TpmTransportOps for TpmTransport<D> {
    fn is_present(&mut self) -> bool {
        match self.driver.probe(tcg::TcgCall::status_check()) {
            Ok(tcg::TCG_PC_OK) => true,
            Ok(status) => {
                log::debug!("TCG status check returned {:#06x}", status);
                false
            }
            Err(err) => {
                log::debug!("TCG status check failed: {}", err);
                false
            }
        }
    }

    fn extend(
        &mut self,
        pcr_index: tcg::TpmPcrIndex,
        digest: &tcg::TpmDigest,
    ) -> result::Result<(), TransportError> {
        let mut block = ExtendCommand::new(pcr_index, digest).to_block()?;
        log::debug!("TCG pass-through block: {}", hex::encode(&block[..]));

        let status = self
            .driver
            .passthrough(tcg::TcgCall::pass_through(), &mut block)?;
        if status != tcg::TCG_PC_OK {
            log::debug!("Received error code from TPM: {:#x}", status);
            return Err(TransportError::Status(status));
        }

        // The register status is the verdict, the output block is only read
        // for the new PCR value
        match ExtendResponse::from_block(&block) {
            Ok(resp) if resp.header.return_code == tcg::TPM_SUCCESS => log::debug!(
                "PCR {} is now {}",
                pcr_index,
                hex::encode(&resp.out_digest[..])
            ),
            _ => log::debug!("No PCR value in output block"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::errors::DeviceIoError;
    use crate::device::sim::SoftTpm;

    // FixedStatus answers every call with the same firmware status and
    // records what it was handed
    struct FixedStatus {
        status: tcg::TcgStatus,
        calls: Vec<tcg::TcgCall>,
        blocks: Vec<Vec<u8>>,
    }

    impl FixedStatus {
        fn new(status: tcg::TcgStatus) -> Self {
            FixedStatus {
                status,
                calls: Vec::new(),
                blocks: Vec::new(),
            }
        }
    }

    impl PlatformTpmDriver for FixedStatus {
        fn probe(&mut self, call: tcg::TcgCall) -> result::Result<tcg::TcgStatus, DeviceIoError> {
            self.calls.push(call);
            Ok(self.status)
        }

        fn passthrough(
            &mut self,
            call: tcg::TcgCall,
            block: &mut [u8],
        ) -> result::Result<tcg::TcgStatus, DeviceIoError> {
            self.calls.push(call);
            self.blocks.push(block.to_vec());
            Ok(self.status)
        }
    }

    struct Unplugged;

    impl PlatformTpmDriver for Unplugged {
        fn probe(&mut self, _call: tcg::TcgCall) -> result::Result<tcg::TcgStatus, DeviceIoError> {
            Err(DeviceIoError::new("no such device"))
        }

        fn passthrough(
            &mut self,
            _call: tcg::TcgCall,
            _block: &mut [u8],
        ) -> result::Result<tcg::TcgStatus, DeviceIoError> {
            Err(DeviceIoError::new("no such device"))
        }
    }

    #[test]
    fn presence_probe_uses_status_check_and_tcpa() {
        let mut transport = TpmTransport::new(FixedStatus::new(tcg::TCG_PC_OK));
        assert!(transport.is_present());
        assert_eq!(
            transport.driver().calls,
            vec![tcg::TcgCall {
                function: 0xBB00,
                magic: 0x4150_4354
            }]
        );
    }

    #[test]
    fn non_zero_probe_status_means_absent() {
        let mut transport = TpmTransport::new(FixedStatus::new(0xBB00));
        assert!(!transport.is_present());
        assert_eq!(transport.driver().calls.len(), 1);
        assert!(!TpmTransport::new(Unplugged).is_present());
    }

    #[test]
    fn firmware_status_is_propagated() {
        let mut transport = TpmTransport::new(FixedStatus::new(0x0023));
        let err = transport.extend(9, &[7; 20]).unwrap_err();
        assert!(matches!(err, TransportError::Status(0x0023)));
        assert_eq!(err.status(), Some(0x23));

        let driver = transport.into_driver();
        assert_eq!(driver.calls, vec![tcg::TcgCall::pass_through()]);
        assert_eq!(driver.blocks.len(), 1);
        assert_eq!(driver.blocks[0].len(), tcg::TCG_EXTEND_BLOCK_SIZE);
        assert_eq!(driver.blocks[0][0x15], 9);
        assert_eq!(&driver.blocks[0][0x16..], &[7; 20]);
    }

    #[test]
    fn tpm_error_surfaces_as_status() {
        let mut transport = TpmTransport::new(SoftTpm::new());
        let err = transport.extend(30, &[0; 20]).unwrap_err();
        assert!(matches!(err, TransportError::Status(tcg::TCG_PC_TPM_ERROR)));
    }

    #[test]
    fn successful_extend_updates_pcr() {
        let mut transport = TpmTransport::new(SoftTpm::new());
        transport.extend(11, &[3; 20]).unwrap();
        assert_ne!(transport.driver().pcr(11), Some(&[0u8; 20]));
    }

    #[test]
    fn zero_status_succeeds_whatever_the_block_holds() {
        // status 0 but the block still holds the request
        let mut transport = TpmTransport::new(FixedStatus::new(tcg::TCG_PC_OK));
        transport.extend(9, &[1; 20]).unwrap();
        let driver = transport.into_driver();
        assert_eq!(driver.blocks.len(), 1);
        assert_eq!(driver.blocks[0][0x15], 9);
    }

    #[test]
    fn device_errors_are_not_statuses() {
        let mut transport = TpmTransport::new(Unplugged);
        let err = transport.extend(8, &[0; 20]).unwrap_err();
        assert!(matches!(err, TransportError::Device(_)));
        assert_eq!(err.status(), None);
    }
}
