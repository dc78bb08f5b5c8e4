//! varnish-metrics - Varnish cache statistics over SSH.
//!
//! Connects to a Varnish host, reads cache counters and backend health, and
//! prints them as text, JSON, YAML or XML.

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

use varnish_metrics::collector::{
    CollectError, Collector, Request, SshShell, Target, TransportError,
};
use varnish_metrics::render::OutputFormat;

/// Varnish cache metrics collector.
///
/// `get-metrics` is the default command: `varnish-metrics -i 10.10.10.10 -o json`
/// is the same as `varnish-metrics get-metrics -i 10.10.10.10 -o json`.
#[derive(Parser)]
#[command(
    name = "varnish-metrics",
    about = "Varnish cache metrics over SSH",
    version,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    metrics: GetMetricsArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    /// Arguments of the command to run, falling back to the top-level flags.
    fn into_metrics_args(self) -> GetMetricsArgs {
        match self.command {
            Some(Command::GetMetrics(args)) => args,
            None => self.metrics,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Gets metrics of the given instance in the given format.
    GetMetrics(GetMetricsArgs),
}

#[derive(Args, Debug)]
struct GetMetricsArgs {
    /// Address of the Varnish host.
    #[arg(short, long, value_name = "INSTANCE_IP", required = true)]
    instance: Option<String>,

    /// Output format: text, json, json-pretty, yaml or xml.
    #[arg(short, long, default_value = "text", value_parser = parse_format)]
    output: OutputFormat,

    /// SSH login user. Defaults to the SSH client configuration.
    #[arg(short, long, env = "VARNISH_METRICS_USER")]
    user: Option<String>,

    /// SSH port.
    #[arg(short, long, default_value = "22", env = "VARNISH_METRICS_PORT")]
    port: u16,

    /// Seconds to wait for the SSH connection.
    #[arg(long, default_value = "10", env = "VARNISH_METRICS_CONNECT_TIMEOUT")]
    connect_timeout: u64,

    /// Print the options and the parsed metrics before the output.
    #[arg(long)]
    debug: bool,
}

/// Validates the format name before any connection is made.
fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
        .map_err(|e| format!("{}\n\nFor help run: varnish-metrics help get-metrics", e))
}

/// Initializes the tracing subscriber on stderr; stdout carries the metrics only.
fn init_logging(verbose: u8, quiet: bool, debug: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let level = if debug && level < Level::DEBUG {
        Level::DEBUG
    } else {
        level
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("varnish_metrics={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn get_metrics(instance: String, args: GetMetricsArgs) -> Result<(), CollectError> {
    let request = Request {
        target: Target::new(instance)
            .with_user(args.user)
            .with_port(args.port)
            .with_connect_timeout(Duration::from_secs(args.connect_timeout)),
        format: args.output,
        debug: args.debug,
    };
    debug!(?request, "starting collection");

    let collector = Collector::new(SshShell::new());
    collector.collect_and_render(&request, &mut io::stdout().lock(), &mut io::stderr().lock())?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (verbose, quiet) = (cli.verbose, cli.quiet);
    let mut args = cli.into_metrics_args();
    let Some(instance) = args.instance.take() else {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "--instance is required")
            .exit()
    };
    init_logging(verbose, quiet, args.debug);

    let result = get_metrics(instance, args);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, "collection failed");
            match &e {
                CollectError::Transport(TransportError::Timeout { .. }) => {
                    eprintln!("ERROR: Connection timed out. Did you provide the correct settings?")
                }
                _ => eprintln!("ERROR: {}", e),
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
