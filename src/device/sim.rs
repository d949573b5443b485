use crate::device::driver::{tpm_status, PlatformTpmDriver};
use crate::device::errors::DeviceIoError;
use crate::tpm::commands::extend::{ExtendCommand, ExtendResponse};
use crate::tpm::serialization::inout::{RwBytes, StaticByteBuffer, TpmStructIn, TpmStructOut};
use crate::tpm::types::tcg;
use sha1::{Digest, Sha1};
use std::result;

/// In-process TPM 1.2 PCR bank behind the TCG BIOS calling convention.
///
/// All PCRs start zeroed, as after a platform reset. Only `TPM_Extend` is
/// understood; any other ordinal is answered with `TPM_BAD_ORDINAL`.
pub struct SoftTpm {
    pcrs: [tcg::TpmDigest; tcg::TPM_NUM_PCR as usize],
}

impl SoftTpm {
    pub fn new() -> Self {
        SoftTpm {
            pcrs: [[0; tcg::TPM_SHA1_DIGEST_SIZE]; tcg::TPM_NUM_PCR as usize],
        }
    }

    pub fn pcr(&self, index: tcg::TpmPcrIndex) -> Option<&tcg::TpmDigest> {
        self.pcrs.get(index as usize)
    }

    fn execute(&mut self, command: &ExtendCommand) -> ExtendResponse {
        if command.header.ordinal != tcg::TPM_ORD_EXTEND {
            return ExtendResponse::failure(tcg::TPM_BAD_ORDINAL);
        }
        let pcr = match self.pcrs.get_mut(command.pcr_index as usize) {
            Some(pcr) => pcr,
            None => return ExtendResponse::failure(tcg::TPM_BADINDEX),
        };
        let mut hasher = Sha1::new();
        hasher.update(&pcr[..]);
        hasher.update(&command.digest[..]);
        *pcr = hasher.finalize().into();
        ExtendResponse::success(pcr)
    }
}

impl Default for SoftTpm {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformTpmDriver for SoftTpm {
    fn probe(&mut self, call: tcg::TcgCall) -> result::Result<tcg::TcgStatus, DeviceIoError> {
        if !call.is_tcg() || call.function != tcg::TCG_STATUS_CHECK {
            return Ok(tcg::TCG_PC_UNSUPPORTED);
        }
        Ok(tcg::TCG_PC_OK)
    }

    fn passthrough(
        &mut self,
        call: tcg::TcgCall,
        block: &mut [u8],
    ) -> result::Result<tcg::TcgStatus, DeviceIoError> {
        if !call.is_tcg() || call.function != tcg::TCG_PASS_THROUGH_TO_TPM {
            return Ok(tcg::TCG_PC_UNSUPPORTED);
        }

        let mut ipb = StaticByteBuffer::<{ tcg::TCG_EXTEND_BLOCK_SIZE }>::from_bytes(block)
            .map_err(|err| DeviceIoError::new(err.msg))?;
        let mut command: ExtendCommand = Default::default();
        command
            .unpack(&mut ipb)
            .map_err(|err| DeviceIoError::new(err.msg))?;

        let response = self.execute(&command);
        let mut opb = StaticByteBuffer::<{ tcg::TCG_EXTEND_BLOCK_SIZE }>::new();
        response
            .pack(&mut opb)
            .map_err(|err| DeviceIoError::new(err.msg))?;
        let len = opb.to_bytes().len();
        if len > block.len() {
            return Err(DeviceIoError::new("output block larger than caller buffer"));
        }
        block[..len].copy_from_slice(opb.to_bytes());
        Ok(tpm_status(response.header.return_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extend(
        tpm: &mut SoftTpm,
        pcr: tcg::TpmPcrIndex,
        digest: &tcg::TpmDigest,
    ) -> (tcg::TcgStatus, ExtendResponse) {
        let mut block = ExtendCommand::new(pcr, digest).to_block().unwrap();
        let status = tpm.passthrough(tcg::TcgCall::pass_through(), &mut block).unwrap();
        (status, ExtendResponse::from_block(&block).unwrap())
    }

    #[test]
    fn extend_folds_digest_into_pcr() {
        let mut tpm = SoftTpm::new();
        let measurement = [0x5Au8; 20];

        let (status, resp) = extend(&mut tpm, 8, &measurement);

        let mut expected = Sha1::new();
        expected.update([0u8; 20]);
        expected.update(measurement);
        let expected: tcg::TpmDigest = expected.finalize().into();
        assert_eq!(status, tcg::TCG_PC_OK);
        assert_eq!(resp.header.return_code, tcg::TPM_SUCCESS);
        assert_eq!(resp.out_digest, expected);
        assert_eq!(tpm.pcr(8), Some(&expected));
        assert_eq!(tpm.pcr(9), Some(&[0u8; 20]));
    }

    #[test]
    fn extend_is_order_dependent() {
        let mut a = SoftTpm::new();
        let mut b = SoftTpm::new();
        extend(&mut a, 10, &[1; 20]);
        extend(&mut a, 10, &[2; 20]);
        extend(&mut b, 10, &[2; 20]);
        extend(&mut b, 10, &[1; 20]);
        assert_ne!(a.pcr(10), b.pcr(10));
    }

    #[test]
    fn out_of_bank_index_is_bad_index() {
        let mut tpm = SoftTpm::new();
        let (status, resp) = extend(&mut tpm, tcg::TPM_NUM_PCR, &[0; 20]);
        assert_eq!(status, tcg::TCG_PC_TPM_ERROR);
        assert_eq!(resp.header.return_code, tcg::TPM_BADINDEX);
    }

    #[test]
    fn other_ordinals_are_refused() {
        let mut tpm = SoftTpm::new();
        let mut command = ExtendCommand::new(8, &[0; 20]);
        command.header.ordinal = 0x15;
        let mut block = command.to_block().unwrap();
        let status = tpm.passthrough(tcg::TcgCall::pass_through(), &mut block).unwrap();
        assert_eq!(status, tcg::TCG_PC_TPM_ERROR);
        let resp = ExtendResponse::from_block(&block).unwrap();
        assert_eq!(resp.header.return_code, tcg::TPM_BAD_ORDINAL);
        assert_eq!(tpm.pcr(8), Some(&[0u8; 20]));
    }

    #[test]
    fn calls_without_tcpa_signature_are_unsupported() {
        let mut tpm = SoftTpm::new();
        let call = tcg::TcgCall {
            function: tcg::TCG_PASS_THROUGH_TO_TPM,
            magic: 0x1234_5678,
        };
        let mut block = ExtendCommand::new(8, &[0; 20]).to_block().unwrap();
        assert_eq!(tpm.passthrough(call, &mut block).unwrap(), tcg::TCG_PC_UNSUPPORTED);
        assert_eq!(tpm.pcr(8), Some(&[0u8; 20]));
    }
}
