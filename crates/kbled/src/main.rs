//! kbled — read and set keyboard indicator LEDs on every attached keyboard.

use std::path::PathBuf;

use clap::Parser;

mod cli;

#[derive(Parser)]
#[command(
    name = "kbled",
    version,
    about = "Read and set Num/Caps/Scroll Lock indicators on every attached keyboard"
)]
struct Args {
    /// Print one state line per keyboard
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only touch keyboards whose name matches this glob (e.g. "Apple*")
    #[arg(short, long, global = true, value_name = "GLOB")]
    name: Option<String>,

    /// Use an alternative config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output as JSON (for status, config)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: cli::Command,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();
    let globals = cli::GlobalArgs {
        verbose: args.verbose,
        name: args.name,
        config: args.config,
        json: args.json,
    };

    if let Err(e) = cli::run(args.command, &globals) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
