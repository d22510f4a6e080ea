use clap::Parser;
use datakit_cli::{Cli, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = run(cli).await?;
    println!("{output}");
    Ok(())
}
