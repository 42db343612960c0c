use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fipath",
    about = "Deterministic FI projection engine (accounts + benefits + withdrawal waterfall)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Evaluate a JSON plan payload from a file and print the response.
    Run {
        #[arg(long, help = "Path to a JSON plan payload")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = fipath::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Run { input } => {
            let result = fs::read_to_string(&input)
                .map_err(|e| format!("Cannot read {}: {e}", input.display()))
                .and_then(|json| fipath::api::evaluate_plan_json(&json));
            match result {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
