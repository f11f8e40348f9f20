use clap::Parser;
use colored::Colorize;

use learnhub::cli::Cli;
use learnhub::config::{get_config, init_config_from};
use learnhub::interfaces::cli::run_cli_command;
use learnhub::runtime::modes::run_server;
use learnhub::system::logging::init_logging;
use learnhub::system::panic_handler::{RunMode, install_panic_hook};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_config_from(&cli.config);

    match cli.command {
        Some(command) => {
            install_panic_hook(RunMode::Cli);
            if let Err(e) = run_cli_command(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
        None => {
            install_panic_hook(RunMode::Server);
            let _guard = init_logging(&get_config().logging)?;
            if let Err(e) = run_server().await {
                eprintln!("{} {:#}", "Server error:".red().bold(), e);
                return Err(e);
            }
            Ok(())
        }
    }
}
