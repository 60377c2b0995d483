use clap::{App, Arg};
use colored::*;
use sectorwatch::protocol::{ProtocolHandler, ResponseStatus};
use sectorwatch::runtime::{self, SharedCenter, SimulationRuntime};
use sectorwatch::{EngineConfig, MonitoringCenter, MonitoringSummary, OperationalStatus};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time;
use tracing::{error, info, warn, Level};

const DEFAULT_SECTORS: &str = "12";
const DEFAULT_SUMMARY_INTERVAL_SECS: &str = "10";
const UNBOUNDED_RUN_SECS: u64 = 365 * 24 * 60 * 60;
const INCIDENT_BANNER_LIMIT: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("sectorwatch")
        .version("0.1.0")
        .about("🛡️  Sector monitoring center - status, battery and alarm simulation")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("sectors")
                .short("n")
                .long("sectors")
                .value_name("COUNT")
                .help("Number of demo sectors to seed when the config names none")
                .takes_value(true)
                .default_value(DEFAULT_SECTORS)
                .validator(|v| v.parse::<usize>().map(|_| ()).map_err(|_| "Sector count must be a number".into())),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed for the alarm injection random source")
                .takes_value(true)
                .validator(|v| v.parse::<u64>().map(|_| ()).map_err(|_| "Seed must be a number".into())),
        )
        .arg(
            Arg::with_name("duration")
                .short("d")
                .long("duration")
                .value_name("SECONDS")
                .help("Stop after this many seconds (runs until Ctrl+C otherwise)")
                .takes_value(true)
                .validator(|v| v.parse::<u64>().map(|_| ()).map_err(|_| "Duration must be a number".into())),
        )
        .arg(
            Arg::with_name("summary-interval")
                .long("summary-interval")
                .value_name("SECONDS")
                .help("Seconds between monitoring summaries")
                .takes_value(true)
                .default_value(DEFAULT_SUMMARY_INTERVAL_SECS)
                .validator(|v| match v.parse::<u64>() {
                    Ok(n) if n > 0 => Ok(()),
                    _ => Err("Summary interval must be a positive number".into()),
                }),
        )
        .arg(
            Arg::with_name("no-alarms")
                .long("no-alarms")
                .help("Disable random alarm injection"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable debug logging"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();

    let mut config = match matches.value_of("config") {
        Some(path) => EngineConfig::load(Path::new(path))?,
        None => EngineConfig::default(),
    };
    if config.seed_sectors.is_empty() {
        let count = matches.value_of("sectors").unwrap_or(DEFAULT_SECTORS).parse::<usize>()?;
        config = config.with_generated_sectors(count);
    }
    if let Some(seed) = matches.value_of("seed") {
        config.rng_seed = Some(seed.parse()?);
    }
    if matches.is_present("no-alarms") {
        config.alarm_injection_enabled = false;
    }
    let summary_secs = matches
        .value_of("summary-interval")
        .unwrap_or(DEFAULT_SUMMARY_INTERVAL_SECS)
        .parse::<u64>()?;
    let duration = matches.value_of("duration").map(str::parse::<u64>).transpose()?;

    eprintln!("{}", "🛡️  Sectorwatch Monitoring Center".bright_white().bold());
    eprintln!("{}", "================================".bright_white());

    let history_limit = config.history_display_limit;
    let center = runtime::shared(MonitoringCenter::from_config(config.clone())?);
    let sim = SimulationRuntime::from_config(Arc::clone(&center), &config);

    print_summary(&center).await;

    let mut handler = ProtocolHandler::new(history_limit);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let mut summary_interval = time::interval_at(
        time::Instant::now() + Duration::from_secs(summary_secs),
        Duration::from_secs(summary_secs),
    );
    let deadline = time::sleep(Duration::from_secs(duration.unwrap_or(UNBOUNDED_RUN_SECS)));
    tokio::pin!(deadline);
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
                break;
            }
            () = &mut deadline, if duration.is_some() => {
                info!("Run duration elapsed, shutting down");
                break;
            }
            _ = summary_interval.tick() => {
                print_summary(&center).await;
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let response = match handler.parse_command(line) {
                            Ok(command) => {
                                let mut guard = center.lock().await;
                                handler.execute(&mut guard, command)
                            }
                            Err(e) => handler.create_error_response(0, &e.to_string()),
                        };
                        if response.status != ResponseStatus::Success {
                            warn!("Command {} returned {:?}", response.id, response.status);
                        }
                        match handler.serialize_response(&response) {
                            Ok(json) => {
                                stdout.write_all(json.as_bytes()).await?;
                                stdout.write_all(b"\n").await?;
                                stdout.flush().await?;
                            }
                            Err(e) => error!("Failed to serialize response: {}", e),
                        }
                    }
                    Ok(None) => {
                        info!("Console input closed");
                        stdin_open = false;
                    }
                    Err(e) => {
                        error!("Failed to read console input: {}", e);
                        stdin_open = false;
                    }
                }
            }
        }
    }

    let report = sim.shutdown().await;
    print_summary(&center).await;
    eprintln!(
        "{} Stopped after {} decay ticks and {} alarm ticks ({} console commands)",
        "✅".green(),
        report.decay_ticks,
        report.alarm_ticks,
        handler.commands_handled()
    );

    Ok(())
}

async fn print_summary(center: &SharedCenter) {
    let (summary, sectors) = {
        let guard = center.lock().await;
        (guard.summary(), guard.incident_sectors(INCIDENT_BANNER_LIMIT))
    };
    render_summary(&summary);
    for sector in &sectors {
        let status = if sector.status == OperationalStatus::Emergency {
            sector.status.label().bright_red().bold()
        } else {
            sector.status.label().red()
        };
        eprintln!(
            "   {} #{:<4} {:<24} {:>3}% {}",
            "⚠️".yellow(),
            sector.number,
            sector.address,
            sector.battery_percent,
            status
        );
    }
}

fn render_summary(summary: &MonitoringSummary) {
    let stats = &summary.stats;
    let emergency = if stats.emergency > 0 {
        format!("{}", stats.emergency).bright_red().bold()
    } else {
        format!("{}", stats.emergency).white()
    };
    let alarm = if stats.alarm > 0 {
        format!("{}", stats.alarm).red()
    } else {
        format!("{}", stats.alarm).white()
    };
    let low = if stats.low_battery > 0 {
        format!("{}", stats.low_battery).yellow()
    } else {
        format!("{}", stats.low_battery).white()
    };

    eprintln!(
        "{} total {} | protected {} | unprotected {} | alarm {} | emergency {} | low battery {} | contract {}",
        "📊".bright_blue(),
        stats.total.to_string().bright_white(),
        stats.protected.to_string().green(),
        stats.unprotected,
        alarm,
        emergency,
        low,
        stats.contract_impaired
    );
    if let Some(at) = summary.last_emergency_at {
        eprintln!("   {} last emergency at {}", "🆘".red(), at);
    }
}
