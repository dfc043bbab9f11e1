use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rtu_telemetry::logging::{init_logger_with_default, log_info, log_statistics, log_warn};
use rtu_telemetry::payload::{decode, format_raw_hex, ChannelValues, DecodeDescriptor, Reading};
use rtu_telemetry::rtu::Parity;
use rtu_telemetry::{
    open_bus, poll_profile, GatewayConfig, RegisterBank, SerialConfig, VendorRegistry,
};

#[derive(Parser)]
#[command(name = "rtu-cli")]
#[command(about = "CLI tool for Modbus RTU field instruments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PortArgs {
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,
    #[arg(short, long, default_value = "9600")]
    baud: u32,
    #[arg(long, value_enum, default_value = "none")]
    parity: ParityArg,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ParityArg {
    None,
    Even,
    Odd,
}

impl PortArgs {
    fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baud,
            parity: match self.parity {
                ParityArg::None => Parity::None,
                ParityArg::Even => Parity::Even,
                ParityArg::Odd => Parity::Odd,
            },
            ..SerialConfig::default()
        }
    }
}

fn parse_register(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("'{s}': {e}"))
}

#[derive(Subcommand)]
enum Commands {
    /// Read registers once and print the decoded reading as JSON
    Read {
        #[command(flatten)]
        port: PortArgs,
        #[arg(short, long)]
        slave: u8,
        #[arg(long, value_parser = parse_register)]
        start: u16,
        #[arg(short, long, default_value = "1")]
        count: u16,
        /// Read input registers (0x04) instead of holding registers
        #[arg(long)]
        input: bool,
        /// Data type or compound token, e.g. UINT32 or FLOAT32_3412
        #[arg(short = 't', long = "type", default_value = "UINT16")]
        data_type: String,
        #[arg(short, long)]
        order: Option<String>,
        #[arg(long, default_value = "1.0")]
        scale: f64,
    },
    /// Write one register (0x06) or several consecutive ones (0x10)
    Write {
        #[command(flatten)]
        port: PortArgs,
        #[arg(short, long)]
        slave: u8,
        #[arg(short, long, value_parser = parse_register)]
        address: u16,
        #[arg(required = true, value_parser = parse_register)]
        values: Vec<u16>,
    },
    /// Poll every sensor in a gateway configuration file once
    Poll {
        #[arg(short, long)]
        config: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger_with_default("info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Read {
            port,
            slave,
            start,
            count,
            input,
            data_type,
            order,
            scale,
        } => {
            let descriptor = DecodeDescriptor::resolve(&data_type, order.as_deref())?;
            let count = count.max(descriptor.register_count() as u16);
            let bank = if input {
                RegisterBank::Input
            } else {
                RegisterBank::Holding
            };

            let mut engine = open_bus(&port.serial_config())
                .with_context(|| format!("opening {}", port.port))?;
            let words = engine
                .read_registers(slave, bank, start, count)
                .await
                .with_context(|| format!("reading slave {slave} register {start}"))?;
            let decoded = decode(&words, descriptor, scale)?;

            let reading = Reading {
                unit_id: format!("{slave}:{start}"),
                value: decoded.scaled,
                raw: decoded.raw,
                raw_hex: format_raw_hex(&words, descriptor.data_type),
                valid: true,
                timestamp: Some(chrono::Utc::now()),
                channels: None,
            };
            println!("{}", serde_json::to_string_pretty(&reading)?);
        }
        Commands::Write {
            port,
            slave,
            address,
            values,
        } => {
            let mut engine = open_bus(&port.serial_config())
                .with_context(|| format!("opening {}", port.port))?;
            match values.as_slice() {
                [value] => engine.write_single_register(slave, address, *value).await?,
                many => engine.write_multiple_registers(slave, address, many).await?,
            }
            log_info(format_args!(
                "Wrote {} register(s) at 0x{address:04X} on slave {slave}",
                values.len()
            ));
        }
        Commands::Poll { config } => {
            let config = GatewayConfig::load(&config)?;
            if config.sensors.is_empty() {
                bail!("no sensors configured");
            }
            let vendors = VendorRegistry::with_defaults()?;
            let defaults: ChannelValues = config.channel_defaults;
            let mut engine = open_bus(&config.serial)
                .with_context(|| format!("opening {}", config.serial.port))?;

            let mut readings = Vec::with_capacity(config.sensors.len());
            for profile in &config.sensors {
                let reading = match poll_profile(&mut engine, profile, &vendors, &defaults).await {
                    Ok(reading) => reading,
                    Err(e) => {
                        log_warn(format_args!("{}: {e}", profile.unit_id));
                        Reading::invalid(profile.unit_id.clone())
                    }
                };
                readings.push(reading.with_timestamp(chrono::Utc::now()));
            }

            log_statistics(&config.serial.port, &engine.statistics());
            let output = serde_json::json!({
                "readings": readings,
                "statistics": engine.statistics(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
