mod cli;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    cli::setup_logging(cli.quiet, cli.verbose);

    let result = match &cli.command {
        Commands::Download(args) => command::download(args).await.map(|summary| {
            println!("{summary}");
        }),
        Commands::Coverage {} => {
            print!("{}", command::coverage());
            Ok(())
        }
        Commands::Resolve { time, end } => {
            command::resolve(time, end.as_deref()).map(|line| println!("{line}"))
        }
        Commands::Url(args) => command::url(args).map(|url| println!("{url}")),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
