mod args;
mod batch;
mod generate;
mod search;
mod util;

use args::{Cli, SubCommands};
use generate::generate;
use search::search;

use clap::Parser;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

fn main() -> anyhow::Result<()> {
    color_backtrace::install();

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .format_target(false)
        .init();

    match Cli::parse().command {
        SubCommands::Search(args) => search(&args)?,
        SubCommands::Generate(args) => generate(&args)?,
    }
    Ok(())
}
