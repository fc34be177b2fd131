use crate::cli::{Commands, ConfigCommands};
use crate::config::{Config, ConfigOverrides, PersistentConfig};
use crate::input;
use crate::pipeline;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "histcarve.toml";

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    Config::read_from_file(&path)
}

pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            input: input_path,
            config,
            source_root,
            output_root,
            binary_staging_root,
            no_binary_staging,
            max_commits,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            cfg.apply_overrides(ConfigOverrides {
                source_object_root: source_root,
                output_object_root: output_root,
                skip_binary_staging: if no_binary_staging { Some(true) } else { None },
                binary_staging_root,
                max_commits,
            });

            let file = File::open(&input_path)
                .with_context(|| format!("failed to open input file: {}", input_path.display()))?;
            let parsed = input::parse(file)
                .with_context(|| format!("failed to parse input file: {}", input_path.display()))?;

            log::info!("starting run over {} commits", parsed.records.len());
            let summary = pipeline::run(&cfg, &parsed)?;
            summary.print_terminal_summary();
        }
        Commands::Config(ConfigCommands::Show { config }) => {
            let cfg = load_config(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg).context("failed to render config")?);
        }
    }
    Ok(())
}
