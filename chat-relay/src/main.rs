use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{self, BufReader};

use chat_relay::{
    admin::AdminConsole,
    cli::{ClientArgs, Cli, Command, ServerArgs},
    client::{ClientConfig, ClientSession},
    console::{Console, Flow, run_console},
    relay::{Relay, ServerConfig},
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let flow = match cli.command {
        Command::Server(args) => run_server(args).await?,
        Command::Client(args) => run_client(args).await?,
    };

    if flow == Flow::Quit {
        // Do not wait for in-flight I/O or the blocking stdin reader.
        std::process::exit(0);
    }
    Ok(())
}

async fn run_server(args: ServerArgs) -> Result<Flow> {
    let (console, _printer) = Console::stdout();
    let relay = Relay::new(
        ServerConfig {
            bind: args.bind,
            port: args.port,
        },
        console.clone(),
    );
    relay
        .start()
        .await
        .context("ERROR - Could not listen for clients!")?;

    let mut admin = AdminConsole::new(relay, console.clone());
    let flow = run_console(BufReader::new(io::stdin()), &mut admin)
        .await
        .context("failed to read operator console")?;
    console.flush().await;
    Ok(flow)
}

async fn run_client(args: ClientArgs) -> Result<Flow> {
    let (console, _printer) = Console::stdout();
    let mut session = ClientSession::new(
        ClientConfig {
            login_id: args.login_id,
            host: args.host,
            port: args.port,
        },
        console.clone(),
    );
    if args.connect {
        session.connect_at_startup().await;
    }

    let flow = run_console(BufReader::new(io::stdin()), &mut session)
        .await
        .context("failed to read client console")?;
    console.flush().await;
    Ok(flow)
}
