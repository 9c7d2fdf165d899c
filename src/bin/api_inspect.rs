//! Assembles an application's API tree and prints the resulting registry.
//!
//! Executable modules are listed as unbound functions since no host code is
//! linked in; data files are shown as loaded. Useful for checking what a
//! layout contributes before wiring it into a server.

use anyhow::{Context, Result, anyhow, bail};
use api_registry::logging::init_logging;
use api_registry::{AppConfig, Assembler, ExportRegistry, Registry, find_app_root};
use std::{env, path::PathBuf};
use tracing::info;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse()?;
    let mut config = resolve_config(&cli)?.apply_env()?;
    if let Some(environment) = cli.environment {
        config.environment = environment;
        config.validate().context("applying --env")?;
    }

    let assembler = Assembler::new(config, ExportRegistry::with_unbound_fallback());
    let mut registry = Registry::new();
    let summary = assembler.build_all(&mut registry)?;
    info!(
        assembled = summary.assembled.len(),
        pruned = summary.pruned.len(),
        "registry ready"
    );

    println!("{}", serde_json::to_string_pretty(&registry.summary())?);
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    if let Some(path) = cli.config_path.as_deref() {
        return AppConfig::load(path);
    }
    let root = match cli.root.clone() {
        Some(root) => root,
        None => find_app_root()?,
    };
    AppConfig::load_for_root(&root)
}

struct Cli {
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    environment: Option<String>,
}

impl Cli {
    fn parse() -> Result<Self> {
        let mut args = env::args_os();
        let _program = args.next();
        let mut config_path = None;
        let mut root = None;
        let mut environment = None;

        while let Some(arg) = args.next() {
            let arg_str = arg
                .to_str()
                .ok_or_else(|| anyhow!("invalid UTF-8 in argument"))?;
            match arg_str {
                "--config" => config_path = Some(PathBuf::from(next_value("--config", &mut args)?)),
                "--root" => root = Some(PathBuf::from(next_value("--root", &mut args)?)),
                "--env" => environment = Some(next_value("--env", &mut args)?),
                "--help" | "-h" => usage(0),
                other => bail!("unknown argument: {other}"),
            }
        }

        if config_path.is_some() && root.is_some() {
            bail!("--config and --root are mutually exclusive");
        }

        Ok(Self {
            config_path,
            root,
            environment,
        })
    }
}

fn next_value(flag: &str, args: &mut env::ArgsOs) -> Result<String> {
    let value = args
        .next()
        .ok_or_else(|| anyhow!("{flag} requires a value"))?
        .into_string()
        .map_err(|_| anyhow!("{flag} must be valid UTF-8"))?;
    if value.trim().is_empty() {
        bail!("{flag} must not be empty");
    }
    Ok(value)
}

fn usage(code: i32) -> ! {
    eprintln!(
        "Usage: api-inspect [--config PATH | --root PATH] [--env NAME]\n\nOptions:\n  --config PATH            Load this config file instead of <root>/api-registry.json.\n  --root PATH              Application root (default: API_REGISTRY_ROOT or the nearest dir with api/).\n  --env NAME               Environment whose config overrides apply (or set API_REGISTRY_ENV).\n  --help                   Show this help text."
    );
    std::process::exit(code);
}
