use clap::{Parser, ValueEnum};
use env_logger::{Env, Target};
use log::{error, info};
use shared::{SimulationConfig, DEFAULT_SERVER_ADDR};
use std::fs::File;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Server,
    Client,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Multiplayer terminal pong over UDP", long_about = None)]
struct Args {
    /// Run as the authoritative server or as a player terminal
    #[arg(long, value_enum, default_value_t = Mode::Client)]
    mode: Mode,

    /// Bind address in server mode, server address in client mode
    #[arg(long, default_value = DEFAULT_SERVER_ADDR)]
    server: String,

    /// This client closes the handshake; the game starts once it joins
    #[arg(long)]
    last_client: bool,

    /// Draw the diagnostic overlay
    #[arg(long)]
    debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(args: &Args) -> std::io::Result<()> {
    // The client draws over the whole terminal, so keep it quiet by default.
    let default_level = match args.mode {
        Mode::Server => "info",
        Mode::Client => "warn",
    };

    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    if let Some(path) = &args.log_file {
        builder.target(Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    match args.mode {
        Mode::Server => {
            info!("Starting server on {}", args.server);
            let config = SimulationConfig::default().with_debug(args.debug);
            if let Err(e) = server::run(&args.server, config).await {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        Mode::Client => {
            info!("Connecting to: {}", args.server);
            if let Err(e) = client::run(&args.server, args.last_client, args.debug).await {
                error!("Client stopped: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
