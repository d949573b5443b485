// Types
pub type TpmTag = u16;
pub type TpmCommandOrdinal = u32;
pub type TpmResult = u32;
pub type TpmPcrIndex = u32;
pub type TcgStatus = u16;

pub const TPM_SHA1_DIGEST_SIZE: usize = 20;
pub type TpmDigest = [u8; TPM_SHA1_DIGEST_SIZE];

// TPM 1.2 command tags
pub const TPM_TAG_RQU_COMMAND: TpmTag = 0x00C1;
pub const TPM_TAG_RSP_COMMAND: TpmTag = 0x00C4;

// TPM 1.2 command ordinals
pub const TPM_ORD_EXTEND: TpmCommandOrdinal = 0x0000_0014;

// TPM 1.2 return codes
pub const TPM_SUCCESS: TpmResult = 0x0000_0000;
pub const TPM_BADINDEX: TpmResult = 0x0000_0002;
pub const TPM_BAD_ORDINAL: TpmResult = 0x0000_000A;

// Number of PCRs in a TPM 1.2 PC client
pub const TPM_NUM_PCR: TpmPcrIndex = 24;

// TCG BIOS interface (INT 1Ah) function selectors
pub const TCG_STATUS_CHECK: u16 = 0xBB00;
pub const TCG_PASS_THROUGH_TO_TPM: u16 = 0xBB02;

// "TCPA" in EBX identifies the TCG BIOS interface
pub const TCG_MAGIC: u32 = 0x4150_4354;

// TCG BIOS status codes
pub const TCG_PC_OK: TcgStatus = 0x0000;
pub const TCG_PC_TPM_ERROR: TcgStatus = 0x0001;
pub const TCG_PC_UNSUPPORTED: TcgStatus = 0x0003;

// Sizes of the pieces that make up a pass-through block
pub const TCG_IPB_HEADER_SIZE: usize = 4 * size_of!(u16);
pub const TCG_OPB_HEADER_SIZE: usize = 2 * size_of!(u16);
pub const TPM_COMMAND_HEADER_SIZE: usize =
    size_of!(TpmTag) + size_of!(u32) + size_of!(TpmCommandOrdinal);
pub const TPM_RESPONSE_HEADER_SIZE: usize =
    size_of!(TpmTag) + size_of!(u32) + size_of!(TpmResult);

pub const TPM_EXTEND_COMMAND_SIZE: usize =
    TPM_COMMAND_HEADER_SIZE + size_of!(TpmPcrIndex) + TPM_SHA1_DIGEST_SIZE;
pub const TPM_EXTEND_RESPONSE_SIZE: usize = TPM_RESPONSE_HEADER_SIZE + TPM_SHA1_DIGEST_SIZE;

// 0x2A: input parameter block carrying TPM_Extend
pub const TCG_EXTEND_BLOCK_SIZE: usize = TCG_IPB_HEADER_SIZE + TPM_EXTEND_COMMAND_SIZE;
// 0x22: output parameter block expected back
pub const TCG_EXTEND_OPB_SIZE: usize = TCG_OPB_HEADER_SIZE + TPM_EXTEND_RESPONSE_SIZE;

// TcgCall holds the register inputs of one TCG BIOS interface call
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TcgCall {
    pub function: u16,
    pub magic: u32,
}

impl TcgCall {
    pub fn status_check() -> Self {
        TcgCall {
            function: TCG_STATUS_CHECK,
            magic: TCG_MAGIC,
        }
    }

    pub fn pass_through() -> Self {
        TcgCall {
            function: TCG_PASS_THROUGH_TO_TPM,
            magic: TCG_MAGIC,
        }
    }

    // is_tcg tells whether the call carries the TCPA signature
    pub fn is_tcg(&self) -> bool {
        self.magic == TCG_MAGIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_sizes_match_firmware_layout() {
        assert_eq!(TCG_EXTEND_BLOCK_SIZE, 0x2A);
        assert_eq!(TCG_EXTEND_OPB_SIZE, 0x22);
        assert_eq!(TPM_EXTEND_COMMAND_SIZE, 0x22);
        assert_eq!(TPM_EXTEND_RESPONSE_SIZE, 30);
    }

    #[test]
    fn magic_spells_tcpa() {
        assert_eq!(&TCG_MAGIC.to_le_bytes(), b"TCPA");
    }
}
