//! Match puzzle automation host (default binary).
//!
//! `lumina-match` (or `lumina-match serve`) starts the TCP adapter and runs
//! the session host loop until every client is gone. `lumina-match observe`
//! connects to a running host as an observer and prints what it sees.

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use lumina_match::adapter::{
    run_host, run_server, HostConfig, InboundCommand, OutboundMessage, ServerConfig, SessionHost,
};

mod observe;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Some(config) = observe::parse_observe_args(&args)? {
        return observe::run(&config);
    }

    if let Some(first) = args.first() {
        if first != "serve" {
            return Err(anyhow!(
                "unknown command: {} (expected `serve` or `observe`)",
                first
            ));
        }
    }

    serve()
}

fn serve() -> Result<()> {
    let host_config = HostConfig::from_env();
    let server_config = ServerConfig::from_env();

    let host = SessionHost::new(&host_config)?;
    let session = host.session();
    println!(
        "[Host] level {}x{}, {} colors, target {} in {} moves",
        session.config().grid_size,
        session.config().grid_size,
        session.config().color_count,
        session.config().target_score,
        session.config().move_budget
    );
    println!(
        "[Host] session {} started (seed {})",
        session.session_id(),
        session.seed()
    );

    let max_pending = server_config.max_pending_commands.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        tokio::spawn(async move {
            if let Err(e) = run_server(server_config, cmd_tx, out_rx, None).await {
                eprintln!("[Adapter] server error: {}", e);
            }
        });

        // Exits once the server task and every client are gone.
        run_host(host, cmd_rx, out_tx).await;
    });

    Ok(())
}
