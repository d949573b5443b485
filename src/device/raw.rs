use crate::device::driver::TpmIo;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::{Error, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_TPM_DEVICE: &str = "/dev/tpm0";

// TpmRawIO implements communication with the TPM via /dev/tpm[0-9] device file
pub struct TpmRawIO {
    path: PathBuf,
    device_file: Option<File>,
}

impl TpmRawIO {
    pub fn new(path: impl AsRef<Path>) -> Self {
        TpmRawIO {
            path: path.as_ref().to_path_buf(),
            device_file: None,
        }
    }
}

impl Default for TpmRawIO {
    fn default() -> Self {
        Self::new(DEFAULT_TPM_DEVICE)
    }
}

impl TpmIo for TpmRawIO {
    fn open(&mut self) -> io::Result<()> {
        if self.device_file.is_none() {
            let f = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&self.path)
                .map_err(|err| {
                    Error::new(
                        err.kind(),
                        format!("could not open {}: {}", self.path.display(), err),
                    )
                })?;
            self.device_file = Some(f);
        }
        Ok(())
    }
}

// The character device hands out the whole response on the first read
impl io::Read for TpmRawIO {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.device_file {
            None => Err(Error::new(
                ErrorKind::NotConnected,
                "device file not open for reading",
            )),
            Some(f) => f.read(buf),
        }
    }
}

impl io::Write for TpmRawIO {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.open()?;
        match &mut self.device_file {
            None => Err(Error::new(
                ErrorKind::NotConnected,
                "device file is not set, cannot write input buffer",
            )),
            Some(f) => f.write(buf).map_err(|err| {
                Error::new(
                    err.kind(),
                    format!("could not write buffer to TPM device: {}", err),
                )
            }),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_fails_to_open() {
        let mut rw = TpmRawIO::new("/nonexistent/tpm0");
        let err = rw.open().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("/nonexistent/tpm0"));
    }

    #[test]
    fn read_before_open_is_rejected() {
        let mut rw = TpmRawIO::default();
        let mut buf = [0u8; 4];
        assert_eq!(rw.read(&mut buf).unwrap_err().kind(), ErrorKind::NotConnected);
    }
}
