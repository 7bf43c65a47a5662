#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use awsconsole::app::config::{self, ConsoleConfig};
use awsconsole::app::errors::ConsoleError;
use awsconsole::app::resource_explorer::export;
use awsconsole::app::resource_explorer::tag_filter;
use awsconsole::app::resource_explorer::{
    BackendClient, NetworkTopology, RecordDetail, ResourceClient, ResourceFamily, ResourceRecord,
    RuleFilter,
};
use awsconsole::app::session::{FilePersistence, SessionController, SessionStore};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::prelude::*;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_BRANCH"),
    " ",
    env!("GIT_COMMIT"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "awsconsole")]
#[command(about = "Assume an AWS role and inspect its resources through the console backend")]
#[command(version = VERSION)]
struct Cli {
    /// Console origin the /api paths are resolved against
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Default region for login and EC2 queries
    #[arg(long, global = true)]
    region: Option<String>,

    /// Print pretty JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assume a role and store the session
    Login {
        #[arg(long)]
        role_arn: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the session state
    Status,
    /// List EC2 instances
    Ec2 {
        /// Case-insensitive tag value filter
        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        csv: bool,
    },
    /// List S3 buckets
    S3 {
        #[arg(long)]
        filter: Option<String>,
    },
    /// List Security Groups and their rules
    SecurityGroups {
        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        vpc_id: Option<String>,

        /// Rule protocol, e.g. tcp or All
        #[arg(long)]
        protocol: Option<String>,

        #[arg(long)]
        port: Option<String>,

        #[arg(long)]
        csv: bool,
    },
    /// Show VPCs, subnets and NAT gateways
    Network {
        #[arg(long)]
        filter: Option<String>,
    },
    /// Check a backend service without a session
    Health {
        /// ec2, s3, security-groups or network
        family: ResourceFamily,
    },
}

fn init_logging(config: &ConsoleConfig, verbose: bool) {
    let filter_directive =
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_filter().to_string());
    let filter = tracing_subscriber::EnvFilter::builder()
        .parse(&filter_directive)
        .unwrap_or_else(|e| {
            eprintln!("Invalid log filter '{}': {}", filter_directive, e);
            tracing_subscriber::EnvFilter::new(config::DEFAULT_LOG_FILTER)
        });

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let file_layer = open_log_file().map(|(file, path)| {
        (
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false),
            path,
        )
    });
    let (file_layer, log_path) = match file_layer {
        Some((layer, path)) => (Some(layer), Some(path)),
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    // Bridge log records from reqwest and hyper. Must come after the subscriber.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize log-to-tracing bridge: {}", e);
    }

    if let Some(path) = log_path {
        tracing::debug!("Logging initialized to: {:?}", path);
    }
}

fn log_dir() -> Option<std::path::PathBuf> {
    config::project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}

fn open_log_file() -> Option<(std::fs::File, std::path::PathBuf)> {
    let dir = log_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    let log_path = dir.join("awsconsole.log");

    let file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&log_path)
        .ok()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = file.metadata() {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            if let Err(e) = std::fs::set_permissions(&log_path, perms) {
                eprintln!("[SECURITY] Failed to set log file permissions: {}", e);
            }
        }
    }

    Some((file, log_path))
}

/// Append panics to `<log dir>/crash.log`. The report names the session file
/// so a stuck session can be removed by hand, but never its contents.
fn setup_panic_handler(session_path: Option<std::path::PathBuf>) {
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let payload = panic_info.payload();
        let reason = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic");
        let session = session_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());

        let report = format!(
            "awsconsole {} panicked at {}: {}\nsession file: {}\n{}",
            VERSION,
            location,
            reason,
            session,
            std::backtrace::Backtrace::force_capture()
        );
        eprintln!("\n{}", report);

        let Some(dir) = log_dir() else { return };
        if std::fs::create_dir_all(&dir).is_err() {
            return;
        }
        let crash_log = dir.join("crash.log");
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&crash_log)
        {
            use std::io::Write;
            let _ = writeln!(
                file,
                "=== {} ===\n{}",
                chrono::Local::now().to_rfc3339(),
                report
            );
            eprintln!("Crash report appended to {}", crash_log.display());
        }
    }));
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(2);
        }
    };

    setup_panic_handler(config.session_path());
    init_logging(&config, cli.verbose);
    tracing::info!("awsconsole {} starting: {:?}", VERSION, cli.command);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli, config)) {
        match e.downcast_ref::<ConsoleError>() {
            Some(console_error) => {
                tracing::warn!(kind = console_error.short_label(), "{}", console_error);
                eprintln!("error: {}", console_error);
                if console_error.is_retryable() {
                    eprintln!("The session is still valid; retry when the backend is reachable.");
                }
            }
            None => {
                tracing::error!("{:#}", e);
                eprintln!("error: {:#}", e);
            }
        }
        std::process::exit(1);
    }
}

/// Config file, then environment, then flags
fn load_config(cli: &Cli) -> Result<ConsoleConfig> {
    let mut config = ConsoleConfig::load()?;
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(region) = cli.region.as_ref().filter(|r| !r.trim().is_empty()) {
        config.default_region = region.trim().to_string();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli, config: ConsoleConfig) -> Result<()> {
    let session_path = config
        .session_path()
        .context("No data directory available for the session file")?;
    let store = Arc::new(SessionStore::open(Box::new(FilePersistence::new(
        &session_path,
    ))));
    let backend = BackendClient::new(&config.backend_url)?;
    let controller = Arc::new(SessionController::new(store, backend));
    let client = ResourceClient::new(controller.clone(), config.default_region.clone());
    let json = cli.json;

    match cli.command {
        Command::Login { role_arn } => {
            let session = controller.login(&role_arn, &config.default_region).await?;
            println!("Logged in. Session {}...", session.short_id());
            if let Some(expiration) = session.expiration() {
                println!("Expires at {}", expiration.to_rfc3339());
            }
        }
        Command::Logout => {
            controller.logout()?;
            println!("Logged out.");
        }
        Command::Status => {
            let session = controller.store().current();
            if json {
                let status = serde_json::json!({
                    "state": controller.state(),
                    "session": session.as_ref().map(|s| format!("{}...", s.short_id())),
                    "expiration": session.as_ref().and_then(|s| s.expiration()).map(|e| e.to_rfc3339()),
                    "backend_url": config.backend_url,
                    "session_file": session_path,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("State:        {}", controller.state());
                match &session {
                    Some(s) => println!("Session:      {}...", s.short_id()),
                    None => println!("Session:      -"),
                }
                println!("Backend:      {}", config.backend_url);
                println!("Session file: {}", session_path.display());
            }
        }
        Command::Ec2 { filter, csv } => {
            let records = client.fetch_ec2(&config.default_region).await?;
            let records = tag_filter::filter(&records, filter.as_deref().unwrap_or_default());
            if csv {
                print!("{}", export::ec2_csv(&records));
            } else {
                print_records(&records, json)?;
            }
        }
        Command::S3 { filter } => {
            let records = client.fetch_s3().await?;
            let records = tag_filter::filter(&records, filter.as_deref().unwrap_or_default());
            print_records(&records, json)?;
        }
        Command::SecurityGroups {
            filter,
            vpc_id,
            protocol,
            port,
            csv,
        } => {
            let records = client.fetch_security_groups().await?;
            let records = tag_filter::filter(&records, filter.as_deref().unwrap_or_default());
            let records = RuleFilter {
                vpc_id,
                protocol,
                port,
            }
            .apply(&records);

            if csv {
                print!("{}", export::security_groups_csv(&records));
            } else if json {
                print_records(&records, true)?;
            } else {
                print_security_groups(&records);
            }
        }
        Command::Network { filter } => {
            let topology = client.fetch_network().await?;
            let topology =
                tag_filter::filter_topology(&topology, filter.as_deref().unwrap_or_default());
            if json {
                println!("{}", serde_json::to_string_pretty(&topology)?);
            } else {
                print_network(&topology);
            }
        }
        Command::Health { family } => {
            let health = client.probe(family).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                println!(
                    "{}: {}",
                    health.service.as_deref().unwrap_or(family.label()),
                    health.status
                );
            }
        }
    }

    Ok(())
}

fn print_records(records: &[ResourceRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.resource_id.clone(),
                r.display_name.clone(),
                r.region.clone(),
                r.status.clone(),
                summary(r),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "REGION", "STATUS", "DETAIL"], &rows);
    Ok(())
}

fn summary(record: &ResourceRecord) -> String {
    match &record.detail {
        RecordDetail::Ec2Instance(d) => format!(
            "{} {} private={} public={}",
            d.instance_type, d.availability_zone, d.private_ip, d.public_ip
        ),
        RecordDetail::S3Bucket(d) => format!(
            "versioning={} public_block={} lifecycle_rules={}",
            d.versioning_enabled, d.block_public_access, d.lifecycle_rules
        ),
        RecordDetail::SecurityGroup(d) => format!("vpc={}", d.vpc_id),
        RecordDetail::Vpc(d) => d.cidr_block.clone(),
        RecordDetail::Subnet(d) => format!("{} {}", d.cidr_block, d.availability_zone),
        RecordDetail::NatGateway(d) => format!("{} eip={}", d.gateway_type, d.elastic_ip),
    }
}

fn print_security_groups(records: &[ResourceRecord]) {
    for record in records {
        let Some(group) = record.as_security_group() else {
            continue;
        };
        println!(
            "{} ({}) vpc={} region={}",
            record.resource_id, group.group_name, group.vpc_id, record.region
        );
        let rows: Vec<Vec<String>> = group
            .rules
            .iter()
            .map(|rule| {
                vec![
                    rule.direction.to_string(),
                    rule.protocol.clone(),
                    rule.port.clone(),
                    rule.cidr.clone(),
                    rule.associated_instance
                        .as_ref()
                        .map(|i| format!("{} ({})", i.id, i.name))
                        .unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();
        print_table(&["DIRECTION", "PROTOCOL", "PORT", "CIDR", "INSTANCE"], &rows);
        println!();
    }
}

fn print_network(topology: &NetworkTopology) {
    for vpc in &topology.vpcs {
        println!("{} {} {}", vpc.resource_id, vpc.display_name, summary(vpc));
        for subnet in topology.subnets_in(&vpc.resource_id) {
            println!("  {} {} {}", subnet.resource_id, subnet.display_name, summary(subnet));
        }
    }

    if !topology.nat_gateways.is_empty() {
        println!();
        print_records(&topology.nat_gateways, false).ok();
    }
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let render = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", render(headers.to_vec()));
    for row in rows {
        println!("{}", render(row.iter().map(String::as_str).collect()));
    }
}
