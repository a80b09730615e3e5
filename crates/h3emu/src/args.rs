use crate::MachineConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct Args {
    /// Path to the kernel image to execute. If --kernel-in-sd-card is
    /// set, this is a path inside the SD card image (e.g., "boot/zImage").
    /// Otherwise, it's a path on the local filesystem.
    pub kernel: PathBuf,

    /// Path to SD card image (raw disk image)
    #[arg(long)]
    pub sd_card: Option<PathBuf>,

    /// Interpret the kernel path as a path inside the SD card image
    /// instead of the local filesystem. Requires --sd-card.
    #[arg(long)]
    pub kernel_in_sd_card: bool,

    /// Stop when the CPU reaches this PC (hex: 0x1234 or decimal: 1234)
    #[arg(long, value_parser = parse_hex_or_dec)]
    pub stop_pc: Option<u64>,

    /// Stop after this many instructions
    #[arg(long, short = 'i')]
    pub max_instructions: Option<u64>,

    /// Give up after this many milliseconds of host time
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl Args {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.kernel_in_sd_card && self.sd_card.is_none() {
            return Err("--kernel-in-sd-card requires --sd-card to be specified".to_string());
        }
        Ok(())
    }

    /// Convert Args to MachineConfig
    pub fn to_machine_config(&self) -> MachineConfig {
        MachineConfig {
            sd_card: self.sd_card.clone(),
            dram_size: None,
            stop_pc: self.stop_pc,
            max_instructions: self.max_instructions.map(|v| v as usize),
            timeout_ms: self.timeout_ms,
        }
    }
}

pub fn parse_hex_or_dec(s: &str) -> Result<u64, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

/// Load the kernel image from either a direct file path or from inside
/// an SD card image
pub fn load_kernel_data(args: &Args) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use std::io::Read;
    use tracing::info;

    if args.kernel_in_sd_card {
        // Load from SD card image using fatfs
        let sd_card_path = args
            .sd_card
            .as_ref()
            .ok_or("--kernel-in-sd-card requires --sd-card")?;

        info!(
            "Loading kernel from SD card image: {:?} at path: {:?}",
            sd_card_path, args.kernel
        );

        use fscommon::BufStream;

        let img_file = std::fs::File::open(sd_card_path)?;
        let buf_stream = BufStream::new(img_file);
        let fs = fatfs::FileSystem::new(buf_stream, fatfs::FsOptions::new())?;
        let root_dir = fs.root_dir();

        // Convert PathBuf to string for fatfs
        let kernel_path_str = args
            .kernel
            .to_str()
            .ok_or("kernel path contains invalid UTF-8")?;
        let mut kernel_file = root_dir.open_file(kernel_path_str)?;
        let mut contents = Vec::new();
        kernel_file.read_to_end(&mut contents)?;

        info!("Successfully loaded {} bytes from SD card", contents.len());
        Ok(contents)
    } else {
        // Load directly from filesystem
        info!("Loading kernel from file: {:?}", args.kernel);
        let data = std::fs::read(&args.kernel)?;
        Ok(data)
    }
}
