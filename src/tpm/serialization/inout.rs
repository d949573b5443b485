use crate::tpm::errors;
use crate::tpm::types::tcg;
use std::convert::TryFrom;
use std::result;

// RwBytes is a generic interface for reading and writing bytes.
// It might be backed by a statically or dynamically allocated
// buffer
pub trait RwBytes {
    // write_bytes appends bytes to the underlying buffer, moving
    // the write pointer
    fn write_bytes(&mut self, bytes: &[u8]) -> result::Result<(), errors::SerializationError>;
    // read_bytes consumes size bytes from the underlying buffer, moving
    // the read pointer
    fn read_bytes(&mut self, size: usize) -> result::Result<&[u8], errors::DeserializationError>;
    // to_bytes returns a slice over everything written so far
    fn to_bytes(&self) -> &[u8];
}

// StaticByteBuffer implements a bytes buffer with static allocation. The
// default capacity is one TCG pass-through block.
pub struct StaticByteBuffer<const N: usize = { tcg::TCG_EXTEND_BLOCK_SIZE }> {
    wrptr: usize,
    rdptr: usize,
    buf: [u8; N],
}

impl<const N: usize> RwBytes for StaticByteBuffer<N> {
    fn write_bytes(&mut self, bytes: &[u8]) -> result::Result<(), errors::SerializationError> {
        if self.wrptr + bytes.len() > N {
            return Err(errors::SerializationError {
                msg: format!(
                    "buffer length not sufficient for write_bytes: {} > {}",
                    self.wrptr + bytes.len(),
                    N
                ),
            });
        }
        self.buf[self.wrptr..self.wrptr + bytes.len()].copy_from_slice(bytes);
        self.wrptr += bytes.len();
        Ok(())
    }

    fn read_bytes(&mut self, size: usize) -> result::Result<&[u8], errors::DeserializationError> {
        if self.rdptr + size > self.wrptr {
            return Err(errors::DeserializationError {
                msg: format!(
                    "buffer length not sufficient for read_bytes: {} > {}",
                    self.rdptr + size,
                    self.wrptr
                ),
            });
        }
        self.rdptr += size;
        Ok(&self.buf[self.rdptr - size..self.rdptr])
    }

    fn to_bytes(&self) -> &[u8] {
        &self.buf[0..self.wrptr]
    }
}

impl<const N: usize> StaticByteBuffer<N> {
    pub fn new() -> Self {
        StaticByteBuffer {
            wrptr: 0,
            rdptr: 0,
            buf: [0; N],
        }
    }

    // from_bytes builds a buffer ready to be read back from the start
    pub fn from_bytes(bytes: &[u8]) -> result::Result<Self, errors::SerializationError> {
        let mut buff = Self::new();
        buff.write_bytes(bytes)?;
        Ok(buff)
    }

    // into_inner hands out the whole backing array, including bytes past
    // the write pointer
    pub fn into_inner(self) -> [u8; N] {
        self.buf
    }
}

impl<const N: usize> Default for StaticByteBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// TpmStructOut is a trait for TPM objects which can be serialized in
// big endian byte stream for TPM operations
pub trait TpmStructOut {
    fn pack(&self, buff: &mut dyn RwBytes) -> result::Result<(), errors::SerializationError>;
}

// TpmStructIn is a trait for TPM objects which can be deserialized from
// a byte stream
pub trait TpmStructIn {
    fn unpack(&mut self, buff: &mut dyn RwBytes) -> result::Result<(), errors::DeserializationError>;
}

// impl_tpm_io is a macro which implements TpmStructIn and TpmStructOut for
// primitive numeric types, always big endian.
macro_rules! impl_tpm_io {
    ($T: ident) => {
        impl TpmStructOut for $T {
            fn pack(&self, buff: &mut dyn RwBytes) -> result::Result<(), errors::SerializationError> {
                buff.write_bytes(&self.to_be_bytes()[..])
            }
        }

        impl TpmStructIn for $T {
            fn unpack(
                &mut self,
                buff: &mut dyn RwBytes,
            ) -> result::Result<(), errors::DeserializationError> {
                let byte_array = <[u8; size_of!($T)]>::try_from(buff.read_bytes(size_of!($T))?);
                match byte_array {
                    Ok(byte_array) => {
                        *self = $T::from_be_bytes(byte_array);
                        Ok(())
                    }
                    Err(_) => Err(errors::DeserializationError {
                        msg: String::from("could not prepare byteArray"),
                    }),
                }
            }
        }
    };
}

impl_tpm_io! { u8 }
impl_tpm_io! { u16 }
impl_tpm_io! { u32 }

impl TpmStructOut for tcg::TpmDigest {
    fn pack(&self, buff: &mut dyn RwBytes) -> result::Result<(), errors::SerializationError> {
        buff.write_bytes(&self[..])
    }
}

impl TpmStructIn for tcg::TpmDigest {
    fn unpack(&mut self, buff: &mut dyn RwBytes) -> result::Result<(), errors::DeserializationError> {
        self.copy_from_slice(buff.read_bytes(tcg::TPM_SHA1_DIGEST_SIZE)?);
        Ok(())
    }
}

// pack_le16 writes a little endian WORD, the byte order of the TCG BIOS
// parameter block headers
pub fn pack_le16(value: u16, buff: &mut dyn RwBytes) -> result::Result<(), errors::SerializationError> {
    buff.write_bytes(&value.to_le_bytes())
}

// unpack_le16 reads a little endian WORD
pub fn unpack_le16(buff: &mut dyn RwBytes) -> result::Result<u16, errors::DeserializationError> {
    let bytes = buff.read_bytes(size_of!(u16))?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

// pack writes fields in order, the way Command/Response structures lay
// them out on the wire
pub fn pack(
    fields: &[&dyn TpmStructOut],
    buff: &mut dyn RwBytes,
) -> result::Result<(), errors::SerializationError> {
    for field in fields.iter() {
        field.pack(buff)?;
    }
    Ok(())
}
