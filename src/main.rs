use anyhow::Result;
use clap::Parser;
use identity_sorter::{cli, logging};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init(&args.config().log_filter)?;

    let code = cli::run(args)?;
    std::process::exit(code);
}
