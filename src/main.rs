use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use packet_analyzer::analysis::severity_breakdown;
use packet_analyzer::app::App;
use packet_analyzer::filter::FilterCriteria;
use packet_analyzer::formatting::{
    format_analysis_lines, format_file_size, format_packet_line, format_rate, format_timestamp,
    truncate_string,
};
use packet_analyzer::monitor::ConnectionState;
use packet_analyzer::session::CaptureSession;
use packet_analyzer::settings::Config;
use packet_analyzer::storage::StorageFormat;

#[derive(Parser)]
#[command(name = "packet-analyzer")]
#[command(about = "Client for the packet capture and analysis service")]
struct Cli {
    #[arg(short, long, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable debug logging")]
    debug: bool,

    #[arg(long, help = "Service base URL, overrides the config file")]
    backend_url: Option<String>,

    #[arg(long, help = "Request timeout in milliseconds, overrides the config file")]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the service once and report the connection state
    Health,
    /// Keep probing the service until interrupted
    Watch,
    /// Capture packets and run the analysis stages over them
    Capture {
        #[arg(short = 'n', long, help = "Number of packets to capture")]
        count: Option<u32>,
        #[arg(long, help = "Capture live traffic instead of simulated packets")]
        real: bool,
        #[arg(long, help = "Only show packets whose protocol contains this text")]
        protocol: Option<String>,
        #[arg(long, help = "Only show packets whose source address contains this text")]
        src_ip: Option<String>,
        #[arg(long, help = "Only show packets whose destination address contains this text")]
        dst_ip: Option<String>,
        #[arg(long, help = "Save the captured packets under this name")]
        save: Option<String>,
        #[arg(long, help = "Storage format for --save (json or binary)")]
        format: Option<StorageFormat>,
    },
    /// List stored captures
    List,
    /// Load a stored capture
    Load {
        name: String,
        #[arg(long, help = "Run analysis, statistics and issue detection on the loaded packets")]
        analyze: bool,
    },
    /// Delete a stored capture
    Delete {
        name: String,
        #[arg(short, long, help = "Do not ask for confirmation")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(url) = cli.backend_url {
        config.backend.base_url = url;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.backend.timeout_ms = timeout_ms;
    }
    config.validate()?;
    log::debug!("Using backend at {}", config.backend.base_url);

    let mut app = App::connect(config).context("creating backend client")?;

    match cli.command {
        Command::Health => {
            let state = app.test_connection().await;
            println!("Backend {}: {}", app.config.backend.base_url, state);
            if state != ConnectionState::Connected {
                std::process::exit(1);
            }
        }
        Command::Watch => watch(&mut app).await?,
        Command::Capture {
            count,
            real,
            protocol,
            src_ip,
            dst_ip,
            save,
            format,
        } => {
            let session = app.capture(count, real.then_some(true)).await?;
            println!(
                "Captured {} packets ({})",
                session.packets.len(),
                session.mode.map(|m| m.to_string()).unwrap_or_default()
            );

            let mut criteria = FilterCriteria::new();
            criteria.protocol = protocol;
            criteria.src_ip = src_ip;
            criteria.dst_ip = dst_ip;
            app.set_filter(criteria);

            print_session(&app, &session);

            if let Some(name) = save {
                match app.save(&name, format).await? {
                    Some(record) => println!(
                        "Saved '{}' ({})",
                        record.filename,
                        format_file_size(record.size)
                    ),
                    None => println!("Saved '{}'", name),
                }
            }
        }
        Command::List => {
            let records = app.refresh_saved().await?;
            if records.is_empty() {
                println!("No stored captures");
            }
            for record in records {
                println!(
                    "{:<32} {:>10}  {}",
                    truncate_string(&record.filename, 32),
                    format_file_size(record.size),
                    format_timestamp(&record.modified)
                );
            }
        }
        Command::Load { name, analyze } => {
            let mut session = app.load(&name).await?;
            println!("Loaded {} packets from '{}'", session.packets.len(), name);
            if analyze {
                session = app.reanalyze().await?;
            }
            print_session(&app, &session);
        }
        Command::Delete { name, yes } => {
            if !yes && !confirm(&format!("Delete stored capture '{}'?", name))? {
                println!("Cancelled");
                return Ok(());
            }
            app.delete(&name).await?;
            println!("Deleted '{}'", name);
        }
    }

    Ok(())
}

async fn watch(app: &mut App) -> anyhow::Result<()> {
    let initial = app.test_connection().await;
    println!("Backend {}: {}", app.config.backend.base_url, initial);
    let mut updates = app.subscribe_connection();

    app.start_monitoring();
    println!("Watching (Ctrl+C to stop)...");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for Ctrl+C")?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *updates.borrow_and_update();
                println!("Backend {}: {}", app.config.backend.base_url, state);
                if state != ConnectionState::Connected {
                    println!("Probing paused; restart to try again");
                }
            }
        }
    }

    app.stop_monitoring().await;
    Ok(())
}

fn print_session(app: &App, session: &CaptureSession) {
    let visible = app.visible_packets();
    if !app.filter().is_empty() {
        println!("Showing {} of {} packets", visible.len(), session.packets.len());
    }
    for packet in &visible {
        println!("{}", format_packet_line(packet));
        if let Some(analysis) = session.analysis_for(packet.number) {
            for line in format_analysis_lines(analysis) {
                println!("{}", line);
            }
        }
    }

    match &session.statistics {
        Some(stats) => {
            println!();
            println!(
                "Total: {} packets, {}, {}",
                stats.total_packets,
                format_file_size(stats.total_data),
                format_rate(stats.traffic_rate)
            );
            for (protocol, share) in stats.top_protocols() {
                println!("  {:<8} {:>4} ({:.1}%)", protocol, share.count, share.percentage);
            }
            let sizes = &stats.packet_size_analysis;
            println!(
                "  sizes: {} small, {} medium, {} large",
                sizes.small.count, sizes.medium.count, sizes.large.count
            );
        }
        None if !session.analyses.is_empty() || !session.issues.is_empty() => {
            println!();
            println!("Statistics unavailable");
        }
        None => {}
    }

    if !session.issues.is_empty() {
        println!();
        let breakdown: Vec<String> = severity_breakdown(&session.issues)
            .into_iter()
            .map(|(severity, count)| format!("{} {}", count, severity))
            .collect();
        println!("Issues ({}):", breakdown.join(", "));
        for issue in &session.issues {
            println!("  [{}] {}: {}", issue.severity, issue.kind, issue.description);
            if let Some(details) = &issue.details {
                println!("      {}", details);
            }
            if let Some(suggestion) = &issue.suggestion {
                println!("      {}", suggestion);
            }
        }
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer)? == 0 {
        bail!("no answer on stdin; pass --yes to delete without confirmation");
    }
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
