use clap::Parser;

use warden::cli::{self, Cli};
use warden::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::run(cli).await
}
