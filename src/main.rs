use clap::Parser;
use pathgate::cli::Cli;

fn main() -> anyhow::Result<()> {
    pathgate::config::init_logging();
    let cli = Cli::parse();
    let exit_code = pathgate::cli::run(cli)?;
    std::process::exit(exit_code);
}
