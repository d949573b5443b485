use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tpm_measure::artifact::LocalArtifactSource;
use tpm_measure::command::{MeasureError, PcrExtendCommand, PcrPolicy};
use tpm_measure::config::{Config, DeviceKind};
use tpm_measure::device::driver::{PlatformTpmDriver, TpmDevice};
use tpm_measure::device::raw::{TpmRawIO, DEFAULT_TPM_DEVICE};
use tpm_measure::device::sim::SoftTpm;
use tpm_measure::device::tcp::{TpmSocketIO, DEFAULT_TPM_ADDRESS};
use tpm_measure::hasher::DEFAULT_CHUNK_SIZE;
use tpm_measure::tpm::transport::TpmTransport;

/// Measure an image into a TPM PCR
#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Arguments {
    /// Image to measure: a path or a file: URI
    image: String,
    /// PCR to extend with the image's SHA-1 digest
    pcr: String,
    /// How TCG calls reach the TPM
    #[arg(long, value_enum, env = "TPM_MEASURE_DEVICE", default_value = "raw")]
    device: DeviceKind,
    /// TPM character device used by --device raw
    #[arg(long, env = "TPM_MEASURE_DEVICE_PATH", default_value = DEFAULT_TPM_DEVICE)]
    device_path: PathBuf,
    /// TPM socket address used by --device socket
    #[arg(long, env = "TPM_MEASURE_ADDRESS", default_value = DEFAULT_TPM_ADDRESS)]
    address: String,
    /// Seconds to wait for the image
    #[arg(long, env = "TPM_MEASURE_TIMEOUT", default_value_t = 60)]
    timeout: u64,
    /// Lowest PCR the command may extend
    #[arg(long, env = "TPM_MEASURE_FIRST_PCR", default_value_t = PcrPolicy::default().first())]
    first_pcr: u32,
    /// Highest PCR the command may extend
    #[arg(long, env = "TPM_MEASURE_LAST_PCR", default_value_t = PcrPolicy::default().last())]
    last_pcr: u32,
    /// Bytes staged per digest update
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Log debug output, including the raw TCG blocks
    #[arg(short, long)]
    verbose: bool,
}

impl Arguments {
    fn config(&self) -> Config {
        Config {
            pcr_policy: PcrPolicy::new(self.first_pcr, self.last_pcr),
            acquire_timeout: Duration::from_secs(self.timeout),
            chunk_size: self.chunk_size,
            device: self.device,
            device_path: self.device_path.clone(),
            address: self.address.clone(),
        }
    }
}

fn driver(config: &Config) -> Box<dyn PlatformTpmDriver> {
    match config.device {
        DeviceKind::Raw => Box::new(TpmDevice::new(TpmRawIO::new(&config.device_path))),
        DeviceKind::Socket => Box::new(TpmDevice::new(TpmSocketIO::new(config.address.clone()))),
        DeviceKind::Sim => Box::new(SoftTpm::new()),
    }
}

fn run(arguments: &Arguments) -> Result<(), MeasureError> {
    let config = arguments.config();
    config.validate()?;
    log::debug!("using {:?}, PCR policy {}", config.device, config.pcr_policy);

    let mut transport = TpmTransport::new(driver(&config));
    let source = LocalArtifactSource;
    let mut command = PcrExtendCommand::new(&mut transport, &source, &config);
    command.execute(&[arguments.image.as_str(), arguments.pcr.as_str()])
}

fn main() {
    let arguments: Arguments = clap::Parser::parse();

    let default_filter = if arguments.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let code = match run(&arguments) {
        Ok(()) => 0,
        Err(err) => {
            log::debug!("{:?}", err);
            log::error!("{}", err);
            err.errno()
        }
    };
    process::exit(code);
}
