use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use devfilter_cli::config::{Config, parse_config_file};
use devfilter_cli::device::Device;
use devfilter_cli::filter::{CommandContext, DeviceFilter, build_chain, contains_symlink};

#[derive(Parser)]
#[command(name = "devfilter")]
#[command(
	author,
	version,
	about = "Decide which block devices are visible using accept/reject regex filters"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Configuration file with the [devices] filter lists
	#[arg(short, long, value_name = "PATH", default_value = "devfilter.toml", global = true)]
	config: PathBuf,

	/// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Evaluate devices against the configured filters
	Check {
		/// Device as a comma-separated alias list, canonical name first
		#[arg(value_name = "ALIASES", required = true)]
		devices: Vec<String>,

		#[command(flatten)]
		overrides: Overrides,
	},
	/// Compile the configured filters and report pattern counts
	Validate,
	/// Report whether any accept pattern names a symlink path
	Symlinks,
}

#[derive(Args)]
struct Overrides {
	/// Skip regex filtering entirely
	#[arg(long)]
	skip_regex: bool,

	/// Treat the devices as an explicit device list
	#[arg(long)]
	devices_list: bool,

	/// A devices file is in use
	#[arg(long)]
	devices_file: bool,

	/// Keep applying the regex filters alongside the devices file
	#[arg(long)]
	filter_with_devices_file: bool,

	/// Keep the canonical name when a later alias is accepted
	#[arg(long)]
	no_preferred_name: bool,
}

impl Overrides {
	fn apply(&self, ctx: &mut CommandContext) {
		ctx.skip_regex |= self.skip_regex;
		ctx.devices_list |= self.devices_list;
		ctx.devices_file |= self.devices_file;
		ctx.filter_with_devices_file |= self.filter_with_devices_file;
		ctx.disable_preferred_name |= self.no_preferred_name;
	}
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	match run(cli) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

/// Initialize tracing subscriber on stderr.
fn init_tracing(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_ansi(std::io::stderr().is_terminal())
		.with_writer(std::io::stderr)
		.init();
}

fn run(cli: Cli) -> Result<ExitCode> {
	let config = load_config(&cli.config)?;

	match cli.command {
		Commands::Check { devices, overrides } => handle_check(&config, &devices, &overrides),
		Commands::Validate => handle_validate(&config, &cli.config),
		Commands::Symlinks => handle_symlinks(&config),
	}
}

fn load_config(path: &Path) -> Result<Config> {
	parse_config_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn handle_check(config: &Config, devices: &[String], overrides: &Overrides) -> Result<ExitCode> {
	let chain = build_chain(&config.devices).context("Failed to build device filters")?;

	let mut ctx = CommandContext::from_config(&config.devices);
	overrides.apply(&mut ctx);

	chain.retain();
	for spec in devices {
		let mut dev = parse_device(spec);
		let verdict = if chain.passes(&ctx, &mut dev) {
			"accepted"
		} else {
			"rejected"
		};
		println!("{}: {}", dev.name(), verdict);
	}
	chain.release();

	Ok(ExitCode::SUCCESS)
}

fn handle_validate(config: &Config, path: &Path) -> Result<ExitCode> {
	let chain = build_chain(&config.devices).context("Failed to build device filters")?;

	println!("Configuration is valid: {}", path.display());
	println!("  global_filter: {} patterns", config.devices.global_filter.len());
	println!("  filter: {} patterns", config.devices.filter.len());
	println!("  active filters: {}", chain.len());

	Ok(ExitCode::SUCCESS)
}

fn handle_symlinks(config: &Config) -> Result<ExitCode> {
	if contains_symlink(&config.devices) {
		println!("Accept patterns reference symlink paths.");
	} else {
		println!("No accept patterns reference symlink paths.");
	}
	Ok(ExitCode::SUCCESS)
}

/// Split a comma-separated alias list into a device.
fn parse_device(spec: &str) -> Device {
	Device::new(
		spec.split(',')
			.map(str::trim)
			.filter(|alias| !alias.is_empty()),
	)
}
