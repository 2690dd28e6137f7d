//! JJYWave - command line generator
//!
//! # Usage
//!
//! ```bash
//! jjywave play                      # transmit until interrupted
//! jjywave play --band 60 --duration 120
//! jjywave frame                     # show the frame for the current minute
//! jjywave frame --at 2025-01-15T14:45:00+09:00
//! jjywave config --write-defaults
//! ```
//!
//! Logging follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use jjywave::generator::GeneratorDelegate;
use jjywave_core::config::{self, CarrierBand, GeneratorConfig};
use jjywave_core::{DecodedFrame, FrameBuilder, Symbol};

#[derive(Parser)]
#[command(name = "jjywave")]
#[command(author, version, about = "JJYWave - JJY longwave time signal generator")]
struct Args {
    /// Config file (default: platform config directory)
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transmit through the default audio output
    Play {
        /// Band to simulate
        #[arg(long, short = 'b', value_enum)]
        band: Option<BandArg>,

        /// Play a test tone at this frequency instead of the band carrier
        #[arg(long, value_name = "HZ")]
        test_frequency: Option<f64>,

        /// Stop after this many seconds
        #[arg(long, short = 'd')]
        duration: Option<u64>,
    },
    /// Print the frame for a minute
    Frame {
        /// Instant to encode, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Show the effective configuration
    Config {
        /// Write the defaults to the config file
        #[arg(long)]
        write_defaults: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BandArg {
    #[value(name = "40")]
    Khz40,
    #[value(name = "60")]
    Khz60,
}

impl From<BandArg> for CarrierBand {
    fn from(band: BandArg) -> Self {
        match band {
            BandArg::Khz40 => CarrierBand::Khz40,
            BandArg::Khz60 => CarrierBand::Khz60,
        }
    }
}

/// Logs generator events
#[cfg_attr(not(feature = "cpal-output"), allow(dead_code))]
struct LogDelegate;

impl GeneratorDelegate for LogDelegate {
    fn on_started(&mut self) {
        tracing::info!("Transmission started");
    }

    fn on_stopped(&mut self) {
        tracing::info!("Transmission stopped");
    }

    fn on_error(&mut self, message: &str) {
        tracing::error!("Generator error: {}", message);
    }

    fn on_frame_rebuilt(&mut self, minute: DateTime<FixedOffset>, length: usize) {
        tracing::info!("Now sending {} ({} s frame)", minute.format("%Y-%m-%d %H:%M"), length);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Play {
            band,
            test_frequency,
            duration,
        } => play(config, band, test_frequency, duration),
        Command::Frame { at } => print_frame(&config, at.as_deref()),
        Command::Config { write_defaults } => show_config(args.config, config, write_defaults),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<GeneratorConfig> {
    match path {
        Some(path) => config::load_from(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(config::load()),
    }
}

#[cfg(feature = "cpal-output")]
fn play(
    mut config: GeneratorConfig,
    band: Option<BandArg>,
    test_frequency: Option<f64>,
    duration: Option<u64>,
) -> Result<()> {
    use std::sync::Arc;
    use std::time::Duration;

    use jjywave::generator::{Generator, spawn_delegate_dispatcher};
    use jjywave::sink::CpalSink;
    use jjywave_core::{Clock, SystemClock};

    if let Some(band) = band {
        config.carrier.set_band(band.into());
    }
    if let Some(frequency) = test_frequency {
        config.carrier.test_mode = true;
        config.carrier.test_frequency = frequency;
    }
    config.carrier.validate()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let sink = Arc::new(CpalSink::new(Arc::clone(&clock)));
    let (generator, events) = Generator::new(config, clock, sink);
    let dispatcher = spawn_delegate_dispatcher(events, LogDelegate)
        .context("failed to spawn event dispatcher")?;

    generator.start();
    match duration {
        Some(seconds) => std::thread::sleep(Duration::from_secs(seconds)),
        None => loop {
            std::thread::sleep(Duration::from_secs(3600));
        },
    }
    generator.stop();
    drop(generator);
    let _ = dispatcher.join();
    Ok(())
}

#[cfg(not(feature = "cpal-output"))]
fn play(
    _config: GeneratorConfig,
    _band: Option<BandArg>,
    _test_frequency: Option<f64>,
    _duration: Option<u64>,
) -> Result<()> {
    anyhow::bail!("audio output is not available: rebuild with `--features cpal-output`")
}

fn print_frame(config: &GeneratorConfig, at: Option<&str>) -> Result<()> {
    let instant = match at {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("invalid instant: {text}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let frame = FrameBuilder::new().build(instant, &config.encoding);

    let line: String = frame
        .symbols()
        .iter()
        .enumerate()
        .map(|(i, symbol)| {
            let c = match symbol {
                Symbol::Mark => 'M',
                Symbol::Bit0 => '0',
                Symbol::Bit1 => '1',
                Symbol::Morse => '~',
            };
            if i % 10 == 9 { format!("{c} ") } else { c.to_string() }
        })
        .collect();
    println!("{}  ({} s)", frame.minute().format("%Y-%m-%d %H:%M %:z"), frame.len());
    println!("{}", line.trim_end());

    if let Some(decoded) = DecodedFrame::decode(&frame) {
        let year = decoded
            .year
            .map_or_else(|| "call sign".to_string(), |y| format!("{y:02}"));
        println!(
            "{:02}:{:02}  day {:03}  year {}  weekday {}  leap {}",
            decoded.hour,
            decoded.minute,
            decoded.day_of_year,
            year,
            decoded.weekday,
            if decoded.leap_warning { "pending" } else { "none" },
        );
    }
    Ok(())
}

fn show_config(path: Option<PathBuf>, config: GeneratorConfig, write_defaults: bool) -> Result<()> {
    let path = path.or_else(|| config::config_dir().map(|dir| dir.join("config.toml")));
    let config = if write_defaults {
        let defaults = GeneratorConfig::default();
        let path = path
            .as_ref()
            .context("no config directory available on this platform")?;
        config::save_to(path, &defaults)?;
        println!("Wrote defaults to {}", path.display());
        defaults
    } else {
        config
    };

    if let Some(path) = &path {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
