//! netlinker command line tool.
//!
//! Loads route fixtures into an in-memory handle and either checks that
//! every fixture is accepted or answers a filtered listing against them.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use netlinker::{
    FamilyFilter, IpAddress, IpPrefix, LogFormat, MockHandle, NetlinkerConfig, Route, RouteFilter,
    RouteHandle,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};

/// Exercise route handles against TOML route fixtures
#[derive(Parser, Debug)]
#[command(name = "netlinker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file ([logging] and [kernel] sections)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Force debug logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed a mock handle from fixtures and report the first rejected route
    Check {
        /// Route fixtures file
        fixtures: PathBuf,
    },

    /// List fixture routes matching a query
    List(ListArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Route fixtures file
    fixtures: PathBuf,

    /// Address family to list
    #[arg(long, default_value = "all")]
    family: FamilyFilter,

    /// Match on destination prefix
    #[arg(long)]
    dst: Option<IpPrefix>,

    /// Match on preferred source
    #[arg(long)]
    src: Option<IpAddress>,

    /// Match on gateway
    #[arg(long)]
    gw: Option<IpAddress>,

    /// Match on routing table
    #[arg(long)]
    table: Option<u32>,

    /// Match on output interface index
    #[arg(long)]
    oif: Option<u32>,

    /// Match on input interface index
    #[arg(long)]
    iif: Option<u32>,

    /// Print matches as a JSON array
    #[arg(long)]
    json: bool,
}

impl ListArgs {
    /// Builds the query route and the mask selecting every given dimension.
    fn query(&self) -> (Route, RouteFilter) {
        let mut query = Route::new();
        let mut mask = RouteFilter::empty();

        if let Some(dst) = self.dst {
            query.dst = Some(dst);
            mask |= RouteFilter::DST;
        }
        if let Some(src) = self.src {
            query.src = Some(src);
            mask |= RouteFilter::SRC;
        }
        if let Some(gw) = self.gw {
            query.gw = Some(gw);
            mask |= RouteFilter::GW;
        }
        if let Some(table) = self.table {
            query.table = table;
            mask |= RouteFilter::TABLE;
        }
        if let Some(oif) = self.oif {
            query.link_index = oif;
            mask |= RouteFilter::OIF;
        }
        if let Some(iif) = self.iif {
            query.ilink_index = iif;
            mask |= RouteFilter::IIF;
        }

        (query, mask)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match NetlinkerConfig::load_or_default(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("netlinker: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings, cli.verbose) {
        eprintln!("netlinker: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("netlinker: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so listings stay
/// machine-readable.
fn init_logging(settings: &NetlinkerConfig, verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let registry = tracing_subscriber::registry().with(filter);
    match settings.logging.format {
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    }
    .context("failed to install log subscriber")
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Check { fixtures } => check(&fixtures),
        Command::List(args) => list(&args),
    }
}

fn load_fixtures(path: &Path) -> Result<NetlinkerConfig> {
    NetlinkerConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn check(path: &Path) -> Result<ExitCode> {
    let fixtures = load_fixtures(path)?;
    let mut handle = MockHandle::new();

    for (i, route) in fixtures.routes.iter().enumerate() {
        if let Err(e) = handle.route_add(route) {
            warn!(index = i, route = %route, error = %e, "Fixture rejected");
            println!("route {} ({}) rejected: {}", i, route, e);
            return Ok(ExitCode::FAILURE);
        }
        debug!(index = i, route = %route, "Fixture accepted");
    }

    println!("{} routes accepted", handle.len());
    Ok(ExitCode::SUCCESS)
}

fn list(args: &ListArgs) -> Result<ExitCode> {
    let fixtures = load_fixtures(&args.fixtures)?;
    let handle = fixtures
        .seeded_handle()
        .with_context(|| format!("seeding routes from {}", args.fixtures.display()))?;

    let (query, mask) = args.query();
    info!(family = %args.family, mask = %mask, "Listing routes");
    let routes = handle.route_list_filtered(args.family, Some(&query), mask)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&routes)?);
    } else {
        for route in &routes {
            println!("{}", route);
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_check_command() {
        let cli = parse(&["netlinker", "-v", "check", "routes.toml"]);
        assert!(cli.verbose);
        assert!(cli.config.is_none());
        match cli.command {
            Command::Check { fixtures } => assert_eq!(fixtures, PathBuf::from("routes.toml")),
            other => panic!("expected check command, got {:?}", other),
        }
    }

    #[test]
    fn test_list_query_selects_given_dimensions() {
        let cli = parse(&[
            "netlinker",
            "list",
            "routes.toml",
            "--family",
            "v4",
            "--gw",
            "10.0.0.1",
            "--oif",
            "5",
        ]);
        let Command::List(args) = cli.command else {
            panic!("expected list command");
        };

        assert_eq!(args.family, FamilyFilter::V4);
        let (query, mask) = args.query();
        assert_eq!(mask, RouteFilter::GW | RouteFilter::OIF);
        assert_eq!(
            query,
            Route::new()
                .with_gw("10.0.0.1".parse().unwrap())
                .with_link_index(5)
        );
    }

    #[test]
    fn test_list_defaults_to_everything() {
        let cli = parse(&["netlinker", "list", "routes.toml"]);
        let Command::List(args) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(args.family, FamilyFilter::All);
        assert!(!args.json);
        assert_eq!(args.query(), (Route::new(), RouteFilter::empty()));
    }

    #[test]
    fn test_bad_arguments_rejected() {
        let bad_prefix = ["netlinker", "list", "r.toml", "--dst", "10.0.0.0/40"];
        assert!(Cli::try_parse_from(bad_prefix).is_err());

        let bad_family = ["netlinker", "list", "r.toml", "--family", "ipx"];
        assert!(Cli::try_parse_from(bad_family).is_err());
    }
}
