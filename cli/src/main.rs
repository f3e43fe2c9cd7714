use clap::Parser;
use color_eyre::Result;
use text2img::{cli::Cli, run_cli};

#[tokio::main]
pub async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    run_cli(Cli::parse()).await
}
