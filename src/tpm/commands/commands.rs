use crate::tpm::errors;
use crate::tpm::serialization::inout;
use crate::tpm::serialization::inout::TpmStructIn;
use crate::tpm::serialization::inout::TpmStructOut;
use crate::tpm::types::tcg;
use std::result;

// InputBlockHeader is the head of a TCG BIOS input parameter block (IPB).
// Both lengths are little endian WORDs, each followed by a reserved WORD.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InputBlockHeader {
    pub ipb_length: u16,
    pub opb_length: u16,
}

impl InputBlockHeader {
    pub fn new(ipb_length: usize, opb_length: usize) -> Self {
        InputBlockHeader {
            ipb_length: ipb_length as u16,
            opb_length: opb_length as u16,
        }
    }
}

impl TpmStructOut for InputBlockHeader {
    fn pack(&self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::SerializationError> {
        inout::pack_le16(self.ipb_length, buff)?;
        inout::pack_le16(0, buff)?;
        inout::pack_le16(self.opb_length, buff)?;
        inout::pack_le16(0, buff)
    }
}

impl TpmStructIn for InputBlockHeader {
    fn unpack(&mut self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::DeserializationError> {
        self.ipb_length = inout::unpack_le16(buff)?;
        inout::unpack_le16(buff)?;
        self.opb_length = inout::unpack_le16(buff)?;
        inout::unpack_le16(buff)?;
        Ok(())
    }
}

// OutputBlockHeader is the head of the output parameter block (OPB) that
// firmware writes back over the input block
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputBlockHeader {
    pub opb_length: u16,
}

impl TpmStructOut for OutputBlockHeader {
    fn pack(&self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::SerializationError> {
        inout::pack_le16(self.opb_length, buff)?;
        inout::pack_le16(0, buff)
    }
}

impl TpmStructIn for OutputBlockHeader {
    fn unpack(&mut self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::DeserializationError> {
        self.opb_length = inout::unpack_le16(buff)?;
        inout::unpack_le16(buff)?;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandHeader {
    pub tag: tcg::TpmTag,
    pub command_size: u32,
    pub ordinal: tcg::TpmCommandOrdinal,
}

impl CommandHeader {
    pub fn new(tag: tcg::TpmTag, command_size: usize, ordinal: tcg::TpmCommandOrdinal) -> Self {
        CommandHeader {
            tag,
            command_size: command_size as u32,
            ordinal,
        }
    }
}

impl TpmStructOut for CommandHeader {
    fn pack(&self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::SerializationError> {
        inout::pack(&[&self.tag, &self.command_size, &self.ordinal], buff)
    }
}

impl TpmStructIn for CommandHeader {
    fn unpack(&mut self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::DeserializationError> {
        self.tag.unpack(buff)?;
        self.command_size.unpack(buff)?;
        self.ordinal.unpack(buff)?;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub tag: tcg::TpmTag,
    pub response_size: u32,
    pub return_code: tcg::TpmResult,
}

impl ResponseHeader {
    pub fn new(response_size: usize, return_code: tcg::TpmResult) -> Self {
        ResponseHeader {
            tag: tcg::TPM_TAG_RSP_COMMAND,
            response_size: response_size as u32,
            return_code,
        }
    }
}

impl TpmStructOut for ResponseHeader {
    fn pack(&self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::SerializationError> {
        inout::pack(&[&self.tag, &self.response_size, &self.return_code], buff)
    }
}

impl TpmStructIn for ResponseHeader {
    fn unpack(&mut self, buff: &mut dyn inout::RwBytes) -> result::Result<(), errors::DeserializationError> {
        self.tag.unpack(buff)?;
        if self.tag != tcg::TPM_TAG_RSP_COMMAND {
            return Err(errors::DeserializationError {
                msg: format!("unexpected response tag {:#06x}", self.tag),
            });
        }
        self.response_size.unpack(buff)?;
        self.return_code.unpack(buff)?;
        Ok(())
    }
}
