//! Binary entrypoint for the MeshTNC CLI.
//!
//! Commands:
//! - `start [--port <path>] [--kiss-port <n>]` - run the TNC on a serial port
//! - `init` - create a starter `config.toml`
//! - `frame [--cmd <n>] [--kiss-port <n>] <hex>` - print the KISS encoding of a payload
//! - `decode <hex>` - print the frames contained in a captured byte stream as JSON
//!
//! See the library crate docs for module-level details: `meshtnc::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use meshtnc::config::Config;
use meshtnc::kiss::{self, split_header, Command, KissDeframer, Port};
use meshtnc::logutil::{hex_snippet, parse_hex};

#[derive(Parser)]
#[command(name = "meshtnc")]
#[command(about = "KISS TNC for LoRa mesh radios")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the TNC on a serial port
    Start {
        /// Serial device (e.g., /dev/ttyUSB0); overrides the config file
        #[arg(short, long)]
        port: Option<String>,

        /// KISS port to answer on; overrides the config file
        #[arg(short, long)]
        kiss_port: Option<u8>,

        /// Start directly in KISS mode instead of the text CLI
        #[arg(long)]
        kiss: bool,
    },
    /// Write a default configuration file
    Init,
    /// Encode a hex payload as a KISS frame
    Frame {
        /// Command code (0 = Data, 6 = Vendor, ...)
        #[arg(long, default_value_t = 0)]
        cmd: u8,
        /// KISS port for the header byte
        #[arg(short, long, default_value_t = 0)]
        kiss_port: u8,
        /// Output capacity in bytes
        #[arg(long, default_value_t = kiss::CMD_BUF_LEN_MAX)]
        capacity: usize,
        /// Fail instead of truncating when the payload does not fit
        #[arg(long)]
        strict: bool,
        /// Payload as hex
        payload: String,
    },
    /// Decode a hex byte stream into frames
    Decode {
        /// Captured serial bytes as hex
        stream: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        Commands::Start { .. } => Some(Config::load_or_default(&cli.config).await?),
        // offline tools only borrow the logging section
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start {
            port,
            kiss_port,
            kiss,
        } => {
            if !std::path::Path::new(&cli.config).exists() {
                warn!("No config file at {}, using defaults", cli.config);
            }
            let mut config = pre_config.unwrap_or_default();
            if let Some(p) = port {
                config.serial.port = p;
            }
            if let Some(k) = kiss_port {
                config.tnc.kiss_port = k;
            }
            config.validate()?;
            info!("Starting MeshTNC v{}", env!("CARGO_PKG_VERSION"));
            run_tnc(config, kiss).await?;
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Frame {
            cmd,
            kiss_port,
            capacity,
            strict,
            payload,
        } => {
            let payload = parse_hex(&payload).ok_or_else(|| anyhow!("payload is not valid hex"))?;
            let port = Port::new(kiss_port)?;
            let command = Command::from_nibble(cmd);
            let framed = if strict {
                kiss::try_encode_frame(command, port, &payload, capacity)?
            } else {
                kiss::encode_frame(command, port, &payload, capacity)
            };
            println!("{}", hex_snippet(&framed, framed.len()));
        }
        Commands::Decode { stream } => {
            let bytes = parse_hex(&stream).ok_or_else(|| anyhow!("stream is not valid hex"))?;
            let mut deframer = KissDeframer::default();
            let frames: Vec<serde_json::Value> = deframer
                .drain(&bytes)
                .iter()
                .map(|frame| {
                    let (port, command) = split_header(frame[0]);
                    serde_json::json!({
                        "port": port.value(),
                        "command": format!("{:?}", command),
                        "payload": hex_snippet(&frame[1..], frame.len()),
                    })
                })
                .collect();
            let counters = deframer.counters();
            let payload = serde_json::json!({
                "frames": frames,
                "aborted": counters.aborted,
                "dropped_escapes": counters.dropped_escapes,
                "truncated": counters.truncated,
                "partial_bytes": deframer.len(),
            });
            println!("{}", payload);
        }
    }

    Ok(())
}

#[cfg(feature = "serial")]
async fn run_tnc(config: Config, start_in_kiss: bool) -> Result<()> {
    use meshtnc::dispatcher::QueueDispatcher;
    use meshtnc::host::TncHost;
    use meshtnc::kiss::KissModem;
    use meshtnc::mode::{CliMode, ModeHandle};
    use meshtnc::transport::SerialTransport;
    use tokio::sync::{mpsc, watch};
    use tokio::time::Duration;

    let transport = SerialTransport::open(&config.serial.port, config.serial.baud_rate)?;
    let (dispatcher, mut outbound) = QueueDispatcher::channel();
    let mode = ModeHandle::new(if start_in_kiss {
        CliMode::Kiss
    } else {
        CliMode::Cli
    });
    let modem = KissModem::with_capacity(
        config.tnc.port()?,
        dispatcher,
        mode,
        config.tnc.command_buffer_len,
        config.tnc.reply_buffer_len,
    );
    let host = TncHost::new(transport, modem);

    // No radio driver is linked into this binary; outbound packets are logged when due.
    tokio::spawn(async move {
        while let Some(packet) = outbound.recv().await {
            tokio::time::sleep_until(packet.due_at().into()).await;
            info!(
                "TX {} bytes (priority {}, delay {:?}): {}",
                packet.payload.len(),
                packet.priority,
                packet.delay,
                hex_snippet(&packet.payload, 64)
            );
        }
    });

    // Radio driver attachment point: received packets are sent on `_radio_rx_tx`,
    // and the driver reports airtime and noise floor through `KissModem::stats_mut`.
    let (_radio_rx_tx, radio_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    host.run(
        Duration::from_millis(config.tnc.poll_interval_ms.max(1)),
        radio_rx,
        shutdown_rx,
    )
    .await?;
    Ok(())
}

#[cfg(not(feature = "serial"))]
async fn run_tnc(_config: Config, _start_in_kiss: bool) -> Result<()> {
    Err(anyhow!("start requires the 'serial' feature"))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Foreground runs also log to the console
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
