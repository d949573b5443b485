use crate::device::driver::TpmIo;
use std::io;
use std::io::{Error, ErrorKind, Read, Write};
use std::net::TcpStream;

pub const DEFAULT_TPM_ADDRESS: &str = "localhost:2321";

// TpmSocketIO implements communication with a TPM (typically a software
// TPM) reachable through a TCP socket that carries raw TPM commands
pub struct TpmSocketIO {
    address: String,
    stream: Option<TcpStream>,
}

impl TpmSocketIO {
    pub fn new(address: impl Into<String>) -> Self {
        TpmSocketIO {
            address: address.into(),
            stream: None,
        }
    }
}

impl TpmIo for TpmSocketIO {
    fn open(&mut self) -> io::Result<()> {
        if self.stream.is_none() {
            let s = TcpStream::connect(&self.address).map_err(|err| {
                Error::new(
                    err.kind(),
                    format!("could not open TPM stream connection to {}: {}", self.address, err),
                )
            })?;
            s.set_nodelay(true)?;
            self.stream = Some(s);
        }
        Ok(())
    }
}

impl io::Read for TpmSocketIO {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            None => Err(Error::new(
                ErrorKind::NotConnected,
                "stream not open for reading",
            )),
            Some(s) => s.read(buf),
        }
    }
}

impl io::Write for TpmSocketIO {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.open()?;
        match &mut self.stream {
            None => Err(Error::new(
                ErrorKind::NotConnected,
                "stream is not configured for writing",
            )),
            Some(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.stream {
            None => Ok(()),
            Some(s) => s.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::driver::{PlatformTpmDriver, TpmDevice};
    use crate::tpm::commands::extend::{ExtendCommand, ExtendResponse};
    use crate::tpm::serialization::inout::{RwBytes, StaticByteBuffer, TpmStructOut};
    use crate::tpm::types::tcg;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn extend_round_trip_over_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut command = [0u8; tcg::TPM_EXTEND_COMMAND_SIZE];
            conn.read_exact(&mut command).unwrap();
            let mut reply = StaticByteBuffer::<64>::new();
            ExtendResponse::success(&[0x42; 20]).pack(&mut reply).unwrap();
            conn.write_all(&reply.to_bytes()[tcg::TCG_OPB_HEADER_SIZE..]).unwrap();
            command
        });

        let mut device = TpmDevice::new(TpmSocketIO::new(address));
        assert_eq!(device.probe(tcg::TcgCall::status_check()).unwrap(), tcg::TCG_PC_OK);
        let mut block = ExtendCommand::new(14, &[0x24; 20]).to_block().unwrap();
        let status = device.passthrough(tcg::TcgCall::pass_through(), &mut block).unwrap();

        assert_eq!(status, tcg::TCG_PC_OK);
        let command = server.join().unwrap();
        assert_eq!(&command[..2], &[0x00, 0xc1]);
        assert_eq!(ExtendResponse::from_block(&block).unwrap().out_digest, [0x42; 20]);
    }

    #[test]
    fn refused_connection_is_reported() {
        // bind then drop to get a port with nobody listening
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let mut rw = TpmSocketIO::new(format!("127.0.0.1:{}", port));
        assert!(rw.open().is_err());
    }
}
