use crate::device::errors::DeviceIoError;
use crate::tpm::commands::commands::InputBlockHeader;
use crate::tpm::commands::commands::OutputBlockHeader;
use crate::tpm::commands::commands::ResponseHeader;
use crate::tpm::serialization::inout::RwBytes;
use crate::tpm::serialization::inout::StaticByteBuffer;
use crate::tpm::serialization::inout::TpmStructIn;
use crate::tpm::serialization::inout::TpmStructOut;
use crate::tpm::types::tcg;
use std::convert::TryFrom;
use std::io;
use std::io::Read;
use std::io::Write;
use std::result;

const TPM_MAX_RESPONSE_SIZE: usize = 4096;

/// Narrow interface to whatever executes TCG BIOS interface calls on this
/// platform.
///
/// Implementations either perform the real firmware call or emulate it on top
/// of a native TPM driver. Both calls report the firmware status register; a
/// non-zero status is not an `Err`.
pub trait PlatformTpmDriver {
    /// Issues a call without a parameter block, e.g. `TCG_StatusCheck`.
    fn probe(&mut self, call: tcg::TcgCall) -> result::Result<tcg::TcgStatus, DeviceIoError>;

    /// Issues `TCG_PassThroughToTPM`. `block` holds the input parameter block
    /// on entry and receives the output parameter block on return.
    fn passthrough(
        &mut self,
        call: tcg::TcgCall,
        block: &mut [u8],
    ) -> result::Result<tcg::TcgStatus, DeviceIoError>;
}

impl<T: PlatformTpmDriver + ?Sized> PlatformTpmDriver for Box<T> {
    fn probe(&mut self, call: tcg::TcgCall) -> result::Result<tcg::TcgStatus, DeviceIoError> {
        (**self).probe(call)
    }

    fn passthrough(
        &mut self,
        call: tcg::TcgCall,
        block: &mut [u8],
    ) -> result::Result<tcg::TcgStatus, DeviceIoError> {
        (**self).passthrough(call, block)
    }
}

// TpmIo is a byte stream towards a TPM which can be opened on demand
pub trait TpmIo: io::Read + io::Write {
    fn open(&mut self) -> io::Result<()>;
}

// TpmDevice represents a TPM device implementing I/O operation
// via internal rw object
pub struct TpmDevice<T: TpmIo> {
    pub rw: T,
}

// TpmDeviceOps is a trait defining operations supported by TpmDevice objects
pub trait TpmDeviceOps {
    fn send_recv(
        &mut self,
        buff_command: &[u8],
        buff_answer: &mut dyn RwBytes,
    ) -> result::Result<(), DeviceIoError>;
}

impl<T: TpmIo> TpmDevice<T> {
    pub fn new(rw: T) -> Self {
        TpmDevice { rw }
    }
}

impl<T: TpmIo> TpmDeviceOps for TpmDevice<T> {
    fn send_recv(
        &mut self,
        buff_command: &[u8],
        buff_answer: &mut dyn RwBytes,
    ) -> result::Result<(), DeviceIoError> {
        self.rw.write_all(buff_command)?;
        self.rw.flush()?;

        // A response is complete once paramSize bytes have arrived
        let mut buff_in = [0u8; TPM_MAX_RESPONSE_SIZE];
        let mut filled = 0;
        let mut expected = tcg::TPM_RESPONSE_HEADER_SIZE;
        while filled < expected {
            let n = self.rw.read(&mut buff_in[filled..])?;
            if n == 0 {
                return Err(DeviceIoError::new(format!(
                    "TPM closed the stream after {} of {} response bytes",
                    filled, expected
                )));
            }
            filled += n;
            if filled >= tcg::TPM_RESPONSE_HEADER_SIZE {
                expected = response_size(&buff_in)?;
            }
        }
        log::debug!("TPM response: {}", hex::encode(&buff_in[..expected]));
        buff_answer
            .write_bytes(&buff_in[..expected])
            .map_err(|err| DeviceIoError::new(err.msg))
    }
}

fn response_size(header: &[u8]) -> result::Result<usize, DeviceIoError> {
    let size = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
    if size < tcg::TPM_RESPONSE_HEADER_SIZE || size > TPM_MAX_RESPONSE_SIZE {
        return Err(DeviceIoError::new(format!("invalid TPM response size {}", size)));
    }
    Ok(size)
}

// tpm_status folds the TPM return code of an emulated pass-through into the
// register status, where firmware callers look for the verdict
pub fn tpm_status(return_code: tcg::TpmResult) -> tcg::TcgStatus {
    if return_code == tcg::TPM_SUCCESS {
        tcg::TCG_PC_OK
    } else {
        log::debug!("TPM returned {:#010x}", return_code);
        tcg::TCG_PC_TPM_ERROR
    }
}

impl<T: TpmIo> PlatformTpmDriver for TpmDevice<T> {
    fn probe(&mut self, call: tcg::TcgCall) -> result::Result<tcg::TcgStatus, DeviceIoError> {
        if !call.is_tcg() || call.function != tcg::TCG_STATUS_CHECK {
            return Ok(tcg::TCG_PC_UNSUPPORTED);
        }
        self.rw.open()?;
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

        let mut ipb = StaticByteBuffer::<TPM_MAX_RESPONSE_SIZE>::from_bytes(block)
            .map_err(|err| DeviceIoError::new(err.msg))?;
        let mut header: InputBlockHeader = Default::default();
        header
            .unpack(&mut ipb)
            .map_err(|err| DeviceIoError::new(err.msg))?;
        let ipb_length = usize::from(header.ipb_length);
        if ipb_length < tcg::TCG_IPB_HEADER_SIZE + tcg::TPM_COMMAND_HEADER_SIZE
            || ipb_length > block.len()
        {
            return Err(DeviceIoError::new(format!(
                "input block length {} does not fit a {} byte buffer",
                ipb_length,
                block.len()
            )));
        }

        let mut response = StaticByteBuffer::<TPM_MAX_RESPONSE_SIZE>::new();
        self.send_recv(&block[tcg::TCG_IPB_HEADER_SIZE..ipb_length], &mut response)?;

        let opb_length = tcg::TCG_OPB_HEADER_SIZE + response.to_bytes().len();
        if opb_length > usize::from(header.opb_length) || opb_length > block.len() {
            return Err(DeviceIoError::new(format!(
                "TPM response of {} bytes does not fit output block of {}",
                opb_length, header.opb_length
            )));
        }

        let mut opb = StaticByteBuffer::<TPM_MAX_RESPONSE_SIZE>::new();
        let opb_header = OutputBlockHeader {
            opb_length: u16::try_from(opb_length).map_err(|err| DeviceIoError::new(err.to_string()))?,
        };
        opb_header
            .pack(&mut opb)
            .and_then(|_| opb.write_bytes(response.to_bytes()))
            .map_err(|err| DeviceIoError::new(err.msg))?;
        block[..opb_length].copy_from_slice(opb.to_bytes());

        let mut header = ResponseHeader::default();
        header
            .unpack(&mut response)
            .map_err(|err| DeviceIoError::new(err.msg))?;
        Ok(tpm_status(header.return_code))
    }
}
