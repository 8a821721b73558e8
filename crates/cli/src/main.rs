use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = datadao_cli::cli::Cli::parse();
    cli.run()
}
