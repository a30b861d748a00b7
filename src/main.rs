//! palm-guard CLI
//!
//! Ignores trackpad clicks for a moment after every keystroke.

use anyhow::Context;
use clap::Parser;
use palm_guard::{
    config::{is_clean_number, Config},
    create_shared_stats,
    driver::enumerate_devices,
    DeviceResolver, EventGate, InputDriver, PalmFilter, ReplayDriver, SharedFilterStats,
    Shutdown, VERSION,
};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(all(target_os = "windows", feature = "interception"))]
use palm_guard::InterceptionDriver;

#[derive(Parser)]
#[command(name = "palm-guard")]
#[command(version = VERSION)]
#[command(about = "Ignore trackpad clicks for a moment after each keystroke", long_about = None)]
struct Cli {
    /// Trackpad hardware id (see --list-devices). Without ids, the first
    /// keyboard and pointing device to produce an event are used.
    #[arg(value_name = "TRACKPAD_ID")]
    trackpad_id: Option<String>,

    /// Keyboard hardware id
    #[arg(value_name = "KEYBOARD_ID")]
    keyboard_id: Option<String>,

    /// How long to ignore the trackpad after a keystroke, in milliseconds
    #[arg(value_name = "WINDOW_MS")]
    window_ms: Option<String>,

    /// List attached devices and their hardware ids, then exit
    #[arg(long)]
    list_devices: bool,

    /// Filter a recorded JSON Lines trace instead of live input; forwarded
    /// events are written to stdout
    #[arg(long, value_name = "TRACE")]
    replay: Option<PathBuf>,

    /// Log every event
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(text) = cli.window_ms.as_deref() {
        if !is_clean_number(text) {
            warn!("Window {text:?} is not a plain number of milliseconds, reading it as a number prefix");
        }
    }

    let config = match Config::from_args(cli.trackpad_id, cli.keyboard_id, cli.window_ms.as_deref())
    {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    let stats = create_shared_stats();
    ctrlc_handler(stats.clone());

    let code = match cli.replay {
        Some(path) => match open_replay(&path) {
            Ok(driver) => cmd_filter(driver, &config, &stats, cli.list_devices),
            Err(e) => {
                error!("{e:#}");
                1
            }
        },
        None => cmd_live(&config, &stats, cli.list_devices),
    };

    std::process::exit(code);
}

fn open_replay(path: &Path) -> anyhow::Result<ReplayDriver<io::Stdout>> {
    let file = File::open(path)
        .with_context(|| format!("Could not open trace {}", path.display()))?;
    ReplayDriver::from_reader(BufReader::new(file), io::stdout())
        .with_context(|| format!("Could not load trace {}", path.display()))
}

#[cfg(all(target_os = "windows", feature = "interception"))]
fn cmd_live(config: &Config, stats: &SharedFilterStats, list_devices: bool) -> i32 {
    match InterceptionDriver::new() {
        Ok(driver) => cmd_filter(driver, config, stats, list_devices),
        Err(e) => {
            error!("{e}");
            1
        }
    }
}

#[cfg(not(all(target_os = "windows", feature = "interception")))]
fn cmd_live(_config: &Config, _stats: &SharedFilterStats, _list_devices: bool) -> i32 {
    error!("Live filtering needs a Windows build with the `interception` feature");
    eprintln!("Use --replay <TRACE> to filter a recorded trace instead.");
    1
}

/// Resolve devices and run the filter loop until the stream ends.
fn cmd_filter<D: InputDriver>(
    mut driver: D,
    config: &Config,
    stats: &SharedFilterStats,
    list_devices: bool,
) -> i32 {
    if list_devices {
        print_devices(&driver);
        return 0;
    }

    let resolver = match &config.descriptors {
        Some(descriptors) => {
            match DeviceResolver::from_descriptors(
                &driver,
                &descriptors.keyboard,
                &descriptors.trackpad,
            ) {
                Ok(resolver) => resolver,
                Err(e) => {
                    error!("{e}");
                    eprintln!("Run with --list-devices to see the attached hardware ids.");
                    return 1;
                }
            }
        }
        None => {
            info!("No hardware ids given, using the first keyboard and pointing device seen");
            DeviceResolver::discovering()
        }
    };

    let gate = EventGate::new(config.suppression_window);
    let mut filter = PalmFilter::new(resolver, gate, stats.clone());

    match filter.run(&mut driver) {
        Shutdown::EndOfStream => info!("Event stream ended"),
        Shutdown::Transport(e) => warn!("Stopping: {e}"),
    }

    // Release the driver before reporting
    drop(driver);
    eprintln!();
    eprintln!("{}", stats.summary());
    0
}

fn print_devices<D: InputDriver>(driver: &D) {
    let devices = enumerate_devices(driver);
    if devices.is_empty() {
        println!("No devices found.");
        return;
    }

    println!("{:<6} {:<10} HARDWARE ID", "ID", "CLASS");
    for device in devices {
        let class = device
            .class
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<10} {}",
            device.id.0,
            class,
            device.hardware_id.as_deref().unwrap_or("(none)")
        );
    }
}

/// Log to stderr; stdout carries the replay output.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "palm_guard=debug"
    } else {
        "palm_guard=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Print the session summary on Ctrl+C.
fn ctrlc_handler(stats: SharedFilterStats) {
    let result = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", stats.summary());
        std::process::exit(0);
    });
    if let Err(e) = result {
        warn!("Could not install Ctrl+C handler: {e}");
    }
}
