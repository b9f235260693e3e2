//! `tablegen` command-line tool

use tablegen_service::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = match Cli::parse_from_legacy(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };
    cli::init_logging(&cli);
    cli::run(&cli)?;
    Ok(())
}
