use crate::tpm::commands::commands::CommandHeader;
use crate::tpm::commands::commands::InputBlockHeader;
use crate::tpm::commands::commands::OutputBlockHeader;
use crate::tpm::commands::commands::ResponseHeader;
use crate::tpm::errors;
use crate::tpm::serialization::inout;
use crate::tpm::serialization::inout::RwBytes;
use crate::tpm::serialization::inout::StaticByteBuffer;
use crate::tpm::serialization::inout::TpmStructIn;
use crate::tpm::serialization::inout::TpmStructOut;
use crate::tpm::types::tcg;
use std::result;

// TPM_Extend command, wrapped in the pass-through input parameter block
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendCommand {
    pub block: InputBlockHeader,
    pub header: CommandHeader,
    pub pcr_index: tcg::TpmPcrIndex,
    pub digest: tcg::TpmDigest,
}

impl ExtendCommand {
    // new creates an ExtendCommand for pcr_index and digest. All length
    // fields are derived from the field sizes.
    pub fn new(pcr_index: tcg::TpmPcrIndex, digest: &tcg::TpmDigest) -> Self {
        ExtendCommand {
            block: InputBlockHeader::new(tcg::TCG_EXTEND_BLOCK_SIZE, tcg::TCG_EXTEND_OPB_SIZE),
            header: CommandHeader::new(
                tcg::TPM_TAG_RQU_COMMAND,
                tcg::TPM_EXTEND_COMMAND_SIZE,
                tcg::TPM_ORD_EXTEND,
            ),
            pcr_index,
            digest: *digest,
        }
    }

    // to_block serializes the command into a fresh pass-through block
    pub fn to_block(&self) -> result::Result<[u8; tcg::TCG_EXTEND_BLOCK_SIZE], errors::SerializationError> {
        let mut buff = StaticByteBuffer::<{ tcg::TCG_EXTEND_BLOCK_SIZE }>::new();
        self.pack(&mut buff)?;
        if buff.to_bytes().len() != tcg::TCG_EXTEND_BLOCK_SIZE {
            return Err(errors::SerializationError {
                msg: format!(
                    "extend block is {} bytes, expected {}",
                    buff.to_bytes().len(),
                    tcg::TCG_EXTEND_BLOCK_SIZE
                ),
            });
        }
        Ok(buff.into_inner())
    }
}

impl TpmStructOut for ExtendCommand {
    fn pack(&self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::SerializationError> {
        inout::pack(
            &[&self.block, &self.header, &self.pcr_index, &self.digest],
            buff,
        )
    }
}

impl TpmStructIn for ExtendCommand {
    fn unpack(&mut self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::DeserializationError> {
        self.block.unpack(buff)?;
        self.header.unpack(buff)?;
        self.pcr_index.unpack(buff)?;
        self.digest.unpack(buff)?;
        Ok(())
    }
}

// TPM_Extend response, wrapped in the pass-through output parameter block.
// out_digest is only present on the wire when return_code is TPM_SUCCESS.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendResponse {
    pub block: OutputBlockHeader,
    pub header: ResponseHeader,
    pub out_digest: tcg::TpmDigest,
}

impl ExtendResponse {
    pub fn success(out_digest: &tcg::TpmDigest) -> Self {
        ExtendResponse {
            block: OutputBlockHeader {
                opb_length: tcg::TCG_EXTEND_OPB_SIZE as u16,
            },
            header: ResponseHeader::new(tcg::TPM_EXTEND_RESPONSE_SIZE, tcg::TPM_SUCCESS),
            out_digest: *out_digest,
        }
    }

    pub fn failure(return_code: tcg::TpmResult) -> Self {
        ExtendResponse {
            block: OutputBlockHeader {
                opb_length: (tcg::TCG_OPB_HEADER_SIZE + tcg::TPM_RESPONSE_HEADER_SIZE) as u16,
            },
            header: ResponseHeader::new(tcg::TPM_RESPONSE_HEADER_SIZE, return_code),
            out_digest: [0; tcg::TPM_SHA1_DIGEST_SIZE],
        }
    }

    // from_block decodes the output parameter block firmware left in block
    pub fn from_block(block: &[u8]) -> result::Result<Self, errors::DeserializationError> {
        let mut buff = StaticByteBuffer::<{ tcg::TCG_EXTEND_BLOCK_SIZE }>::from_bytes(block)
            .map_err(|err| errors::DeserializationError { msg: err.msg })?;
        let mut resp: ExtendResponse = Default::default();
        resp.unpack(&mut buff)?;
        Ok(resp)
    }
}

impl TpmStructOut for ExtendResponse {
    fn pack(&self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::SerializationError> {
        self.block.pack(buff)?;
        self.header.pack(buff)?;
        if self.header.return_code == tcg::TPM_SUCCESS {
            self.out_digest.pack(buff)?;
        }
        Ok(())
    }
}

impl TpmStructIn for ExtendResponse {
    fn unpack(&mut self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::DeserializationError> {
        self.block.unpack(buff)?;
        self.header.unpack(buff)?;
        if self.header.return_code != tcg::TPM_SUCCESS {
            return Ok(());
        }
        if (self.header.response_size as usize) < tcg::TPM_EXTEND_RESPONSE_SIZE {
            return Err(errors::DeserializationError {
                msg: format!(
                    "extend response too short: {} < {}",
                    self.header.response_size,
                    tcg::TPM_EXTEND_RESPONSE_SIZE
                ),
            });
        }
        self.out_digest.unpack(buff)?;
        Ok(())
    }
}
