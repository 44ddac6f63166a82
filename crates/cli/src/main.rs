//! rawhid
//!
//! Command-line tool for talking to raw HID devices: find them, list the
//! interfaces that match, print incoming packets, and send packets.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{parse_hex, setup_logging};
use rawhid::RawHid;
use rawhid_cli::{CliConfig, Overrides, commands};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rawhid")]
#[command(author, version, about = "Exchange raw packets with generic USB HID devices")]
#[command(long_about = "
Finds generic HID interfaces by vendor id, product id and the top-level
usage declared in their report descriptor, then sends and receives
fixed-size packets over their interrupt endpoints.

EXAMPLES:
    # Count devices from a vendor
    rawhid --vid 0x16C0 --pid '*' scan

    # Open every matching interface and show its endpoints
    rawhid --max 8 list

    # Print 10 packets then exit
    rawhid listen --count 10

    # Send one packet (zero-padded to packet_size)
    rawhid send --index 0 '01 02 03'

CONFIGURATION:
    The tool looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/rawhid/rawhid.toml
    3. /etc/rawhid/rawhid.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Vendor id, e.g. 0x16C0, or '*' for any
    #[arg(long, value_name = "ID")]
    vid: Option<String>,

    /// Product id, e.g. 0x0480, or '*' for any
    #[arg(long, value_name = "ID")]
    pid: Option<String>,

    /// Top-level usage page, e.g. 0xFFAB, or '*' for any
    #[arg(long, value_name = "ID")]
    usage_page: Option<String>,

    /// Top-level usage, e.g. 0x0200, or '*' for any
    #[arg(long, value_name = "ID")]
    usage: Option<String>,

    /// Maximum number of devices to open
    #[arg(long, value_name = "N")]
    max: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count matching devices without opening them
    Scan,
    /// Open matching interfaces and list them
    List,
    /// Print packets received from every opened device
    Listen {
        /// Exit after this many packets
        #[arg(long)]
        count: Option<usize>,
    },
    /// Send one packet
    Send {
        /// Device index as printed by `list`
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        /// Packet bytes in hex
        data: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = CliConfig::default();
        let path = CliConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let overrides = Overrides {
        log_level: args.log_level,
        vendor_id: args.vid,
        product_id: args.pid,
        usage_page: args.usage_page,
        usage: args.usage,
        max_devices: args.max,
    };
    let config = CliConfig::resolve(args.config, &overrides)
        .context("Failed to load configuration")?;

    setup_logging(&config.logging.level).context("Failed to setup logging")?;
    info!("rawhid v{}", env!("CARGO_PKG_VERSION"));

    let mut hid = RawHid::system().context("Failed to initialize USB")?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command.unwrap_or(Command::List) {
        Command::Scan => {
            commands::scan(&hid, &config, &mut out)?;
        }
        Command::List => {
            commands::list(&mut hid, &config, &mut out)?;
        }
        Command::Listen { count } => {
            commands::listen(&mut hid, &config, count, &mut out)?;
        }
        Command::Send { index, data } => {
            let payload = parse_hex(&data).context("Invalid packet data")?;
            commands::send(&mut hid, &config, index, &payload, &mut out)?;
        }
    }

    Ok(())
}
