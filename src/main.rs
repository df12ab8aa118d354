mod bridge;
mod client;
mod config;
mod error;
mod locate;
mod model;
mod plan;
mod reconcile;
mod report;
mod topology;

use crate::bridge::BridgeState;
use crate::client::OmadaClient;
use crate::config::{Config, EffectiveConfig, Overrides, Scope, save};
use crate::plan::Strategy;
use crate::report::Listing;
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "omadactl",
    version,
    about = "Take Omada controller SSIDs offline and back without deleting them"
)]
struct Cli {
    #[arg(long, global = true, help = "Controller host (overrides config)")]
    host: Option<String>,

    #[arg(long, global = true, help = "Controller HTTPS port (overrides config)")]
    port: Option<u16>,

    #[arg(long, global = true, help = "Omada site name (overrides config)")]
    site: Option<String>,

    #[arg(long, global = true, help = "Enable debug logging")]
    debug: bool,

    #[arg(
        long,
        short = 'o',
        value_enum,
        default_value_t = OutputFormat::Pretty,
        global = true,
        help = "Output format"
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List SSIDs, or block/unblock one through its MAC filter
    Ssid {
        #[arg(value_enum)]
        action: SsidAction,
        #[arg(long, value_name = "NAME", help = "SSID to modify (defaults to default_ssid)")]
        ssid: Option<String>,
    },
    /// Hide or show the original SSID (broadcast, band and PMF)
    Wifi {
        #[arg(value_enum)]
        action: Toggle,
    },
    /// Serve the HTTP bridge (POST /wifi/{action}, POST /ssid/{action})
    Serve {
        #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:5005")]
        bind: SocketAddr,
        #[arg(
            long,
            value_name = "SECONDS",
            default_value_t = 30,
            help = "Kill a command that runs longer than this"
        )]
        timeout: u64,
    },
    /// Persist controller settings (host/port/site come from the global flags)
    Configure {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long, value_name = "ID", help = "MAC group referenced when an SSID is blocked")]
        mac_filter_id: Option<String>,
        #[arg(long, value_name = "NAME", help = "SSID used by `ssid` when --ssid is omitted")]
        default_ssid: Option<String>,
        #[arg(long, value_name = "NAME", help = "SSID hidden and shown by `wifi`")]
        original_ssid: Option<String>,
        #[arg(
            long,
            value_name = "BOOL",
            help = "Verify the controller's TLS certificate (self-signed certs need false)"
        )]
        verify_tls: Option<bool>,
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::Local,
            help = "Where to write the settings (defaults to local project file)"
        )]
        scope: ScopeArg,
    },
    /// Show current configuration (password masked)
    ConfigShow,
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum SsidAction {
    List,
    Enable,
    Disable,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum Toggle {
    Enable,
    Disable,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
    Raw,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing(debug: bool) {
    let filter = if debug { "omadactl=debug" } else { "omadactl=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let overrides = Overrides {
        host: cli.host.clone(),
        port: cli.port,
        site: cli.site.clone(),
    };

    match cli.command {
        Commands::Ssid { action, ssid } => {
            let cfg = config::resolve(&cwd, overrides)?;
            let mut api = connect(&cfg)?;
            match action {
                SsidAction::List => {
                    let listing =
                        reconcile::with_session(&mut api, |api, site| report::report(api, site))
                            .context("listing wireless networks")?;
                    print_listing(&listing, cli.output)?;
                }
                SsidAction::Enable | SsidAction::Disable => {
                    let enabled = action == SsidAction::Enable;
                    let target = cfg.target_ssid(ssid)?;
                    // the filter id is only written when blocking
                    let mac_filter_id = if enabled {
                        cfg.mac_filter_id.clone().unwrap_or_default()
                    } else {
                        cfg.mac_filter_id()?
                    };
                    let strategy = Strategy::MacFilter { mac_filter_id };
                    apply(&mut api, &target, enabled, &strategy, cli.output)?;
                }
            }
        }
        Commands::Wifi { action } => {
            let cfg = config::resolve(&cwd, overrides)?;
            let target = cfg.original_ssid()?;
            let mut api = connect(&cfg)?;
            apply(
                &mut api,
                &target,
                action == Toggle::Enable,
                &Strategy::Broadcast,
                cli.output,
            )?;
        }
        Commands::Serve { bind, timeout } => {
            let program = std::env::current_exe().context("locating omadactl binary")?;
            let state = BridgeState::new(
                program,
                forwarded_args(&cli.host, cli.port, &cli.site, cli.debug),
                Duration::from_secs(timeout),
            );
            tokio::runtime::Runtime::new()
                .context("starting async runtime")?
                .block_on(bridge::serve(bind, state))?;
        }
        Commands::Configure {
            username,
            password,
            mac_filter_id,
            default_ssid,
            original_ssid,
            verify_tls,
            scope,
        } => {
            let existing = config::load_scope(scope.into(), &cwd)?;
            let update = Config {
                host: cli.host,
                port: cli.port,
                site: cli.site,
                username,
                password,
                mac_filter_id,
                default_ssid,
                original_ssid,
                verify_tls,
            };
            let path = save(scope.into(), &config::merge(existing, update), &cwd)?;
            println!("Saved controller settings to {}", path.display());
        }
        Commands::ConfigShow => {
            let merged = config::load(&cwd)?;
            println!("{}", serde_json::to_string_pretty(&config::masked(&merged))?);
        }
        Commands::Completion { shell } => {
            use clap_complete::{generate, shells};
            let mut cmd = Cli::command();
            let bin = cmd.get_name().to_string();
            match shell {
                CompletionShell::Bash => {
                    generate(shells::Bash, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::Zsh => {
                    generate(shells::Zsh, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::Fish => {
                    generate(shells::Fish, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::PowerShell => {
                    generate(shells::PowerShell, &mut cmd, bin, &mut std::io::stdout())
                }
            }
        }
    }

    Ok(())
}

fn connect(cfg: &EffectiveConfig) -> Result<OmadaClient> {
    let base_url = cfg.base_url();
    if !cfg.verify_tls {
        warn!("TLS certificate verification is disabled for {base_url}");
    }
    info!(url = %base_url, site = %cfg.site, "connecting to Omada controller");
    OmadaClient::new(
        &base_url,
        &cfg.username,
        &cfg.password,
        &cfg.site,
        cfg.verify_tls,
    )
    .context("creating controller client")
}

fn apply(
    api: &mut OmadaClient,
    target: &str,
    enabled: bool,
    strategy: &Strategy,
    output: OutputFormat,
) -> Result<()> {
    let verb = if enabled { "enabling" } else { "disabling" };
    let outcome = reconcile::reconcile(api, target, enabled, strategy)
        .with_context(|| format!("{verb} SSID '{target}'"))?;

    match output {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "ssid": outcome.ssid_name,
                "id": outcome.ssid_id,
                "group": outcome.group_id,
                "enabled": outcome.enabled,
            })
        ),
        OutputFormat::Pretty | OutputFormat::Raw => println!(
            "SSID '{}' {} avec succès",
            outcome.ssid_name, outcome.description
        ),
    }
    Ok(())
}

fn print_listing(listing: &Listing, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Pretty => print!("{}", report::render(listing)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(listing)?),
        OutputFormat::Raw => {
            let raw: Vec<_> = listing
                .groups
                .iter()
                .map(|g| {
                    json!({
                        "id": g.id,
                        "name": g.name,
                        "ssids": g.ssids.iter().map(|s| s.raw.as_value()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string(&raw)?);
        }
    }
    Ok(())
}

/// Global flags the bridge passes on to every child invocation.
fn forwarded_args(
    host: &Option<String>,
    port: Option<u16>,
    site: &Option<String>,
    debug: bool,
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(host) = host {
        args.extend(["--host".to_string(), host.clone()]);
    }
    if let Some(port) = port {
        args.extend(["--port".to_string(), port.to_string()]);
    }
    if let Some(site) = site {
        args.extend(["--site".to_string(), site.clone()]);
    }
    if debug {
        args.push("--debug".to_string());
    }
    args
}
