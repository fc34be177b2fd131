mod cli;
mod command_handler;
mod config;
mod encoding;
mod input;
mod mapping;
mod pipeline;
mod store;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use command_handler::handle_command;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = handle_command(cli.command) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
    Ok(())
}
