//! TCP server for the automation adapter.
//!
//! Accepts line-delimited JSON connections, enforces the handshake and
//! per-client sequencing rules, and forwards validated commands to the
//! session host. Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::protocol::*;
use crate::runtime::{ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
use lumina_match_types::Pos;

fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let mut end = 0usize;
    for b in rest.as_bytes() {
        if b.is_ascii_digit() {
            end += 1;
        } else {
            break;
        }
    }
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            protocol_version: "1.0.0".to_string(),
            max_pending_commands: 10,
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("LUMINA_MATCH_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("LUMINA_MATCH_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7777);

        let max_pending_commands = env::var("LUMINA_MATCH_MAX_PENDING")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let log_path = env::var("LUMINA_MATCH_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) });

        Self {
            host,
            port,
            protocol_version: "1.0.0".to_string(),
            max_pending_commands,
            log_path,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: Arc<RwLock<Vec<ClientHandle>>>,
    controller: Arc<RwLock<Option<usize>>>, // Id of the controlling client
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clients: Arc::new(RwLock::new(Vec::new())),
            controller: Arc::new(RwLock::new(None)),
        }
    }

    /// Check if the adapter is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("LUMINA_MATCH_DISABLED")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false)
    }
}

async fn is_handshaken(state: &Arc<ServerState>, client_id: usize) -> bool {
    let clients = state.clients.read().await;
    clients
        .iter()
        .find(|c| c.id == client_id)
        .map(|c| c.handshaken)
        .unwrap_or(false)
}

async fn check_and_update_seq(state: &Arc<ServerState>, client_id: usize, seq: u64) -> bool {
    let mut clients = state.clients.write().await;
    let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
        return true;
    };

    match client.last_seq {
        None => {
            client.last_seq = Some(seq);
            true
        }
        Some(prev) => {
            if seq <= prev {
                false
            } else {
                client.last_seq = Some(seq);
                true
            }
        }
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: usize,
    pub addr: SocketAddr,
    pub is_controller: bool,
    pub stream_observations: bool,
    pub handshaken: bool,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<ClientOutbound>, // Channel to send messages to client
}

#[derive(Debug, Clone)]
pub enum ClientOutbound {
    Ack(AckMessage),
    Error(ErrorMessage),
    Welcome(WelcomeMessage),
    Observation(ObservationMessage),
}

#[derive(Debug, Clone)]
enum WireRecord {
    Bytes(Vec<u8>),
    Welcome(WelcomeMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
    Observation(ObservationMessage),
}

/// Start the TCP server
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    if ServerState::is_disabled() {
        println!("[Adapter] automation interface disabled via LUMINA_MATCH_DISABLED");
        // Park the task; no socket is ever bound
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
        }
    }

    let wire_log_tx: Option<mpsc::UnboundedSender<WireRecord>> =
        if let Some(path) = config.log_path.clone() {
            let (tx, mut rx) = mpsc::unbounded_channel::<WireRecord>();
            tokio::spawn(async move {
                use tokio::fs::OpenOptions;
                use tokio::io::AsyncWriteExt;

                let mut file = match OpenOptions::new().create(true).append(true).open(&path).await
                {
                    Ok(f) => f,
                    Err(_) => return,
                };

                let mut buf: Vec<u8> = Vec::with_capacity(4096);

                while let Some(rec) = rx.recv().await {
                    match rec {
                        WireRecord::Bytes(b) => {
                            if file.write_all(&b).await.is_err() {
                                break;
                            }
                        }
                        WireRecord::Welcome(v) => {
                            buf.clear();
                            if serde_json::to_writer(&mut buf, &v).is_err() {
                                continue;
                            }
                            if file.write_all(&buf).await.is_err() {
                                break;
                            }
                        }
                        WireRecord::Ack(v) => {
                            buf.clear();
                            if serde_json::to_writer(&mut buf, &v).is_err() {
                                continue;
                            }
                            if file.write_all(&buf).await.is_err() {
                                break;
                            }
                        }
                        WireRecord::Error(v) => {
                            buf.clear();
                            if serde_json::to_writer(&mut buf, &v).is_err() {
                                continue;
                            }
                            if file.write_all(&buf).await.is_err() {
                                break;
                            }
                        }
                        WireRecord::Observation(v) => {
                            buf.clear();
                            if serde_json::to_writer(&mut buf, &v).is_err() {
                                continue;
                            }
                            if file.write_all(&buf).await.is_err() {
                                break;
                            }
                        }
                    }
                    if file.write_all(b"\n").await.is_err() {
                        break;
                    }
                }

                let _ = file.flush().await;
            });
            Some(tx)
        } else {
            None
        };

    let addr = config.socket_addr();
    let listener = TcpListener::bind(&addr).await?;
    let bound = listener.local_addr()?;
    println!("[Adapter] TCP server listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config));
    let mut client_id_counter = 0usize;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                match msg {
                    OutboundMessage::ToClientAck { client_id, ack } => {
                        let clients = state.clients.read().await;
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Ack(ack));
                        }
                    }
                    OutboundMessage::ToClientError { client_id, err } => {
                        let clients = state.clients.read().await;
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Error(err));
                        }
                    }
                    OutboundMessage::ToClientObservation { client_id, obs } => {
                        let clients = state.clients.read().await;
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Observation(obs));
                        }
                    }
                    OutboundMessage::BroadcastObservation { obs } => {
                        let clients = state.clients.read().await;
                        for c in clients.iter() {
                            if c.stream_observations {
                                let _ = c.tx.send(ClientOutbound::Observation(obs.clone()));
                            }
                        }
                    }
                }
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        println!("[Adapter] Client {} connected from {}", client_id, addr);

        let state_clone = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log_tx = wire_log_tx.clone();

        // Spawn task to handle this client
        tokio::spawn(async move {
            if let Err(e) =
                handle_client(socket, addr, client_id, state_clone, command_tx, wire_log_tx).await
            {
                eprintln!("[Adapter] Client {} error: {}", client_id, e);
            }
            println!("[Adapter] Client {} disconnected", client_id);
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log_tx: Option<mpsc::UnboundedSender<WireRecord>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    // Channel to send messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    // Add client to list
    let client_handle = ClientHandle {
        id: client_id,
        addr,
        is_controller: false,
        stream_observations: false,
        handshaken: false,
        last_seq: None,
        tx: tx.clone(),
    };

    {
        let mut clients = state.clients.write().await;
        clients.push(client_handle);
    }

    let wire_log_tx_out = wire_log_tx.clone();

    // Spawn task to write messages to client
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            match msg {
                ClientOutbound::Ack(ack) => {
                    buf.clear();
                    if serde_json::to_writer(&mut buf, &ack).is_err() {
                        continue;
                    }
                    if writer.write_all(&buf).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Ack(ack));
                    }
                }
                ClientOutbound::Error(err) => {
                    buf.clear();
                    if serde_json::to_writer(&mut buf, &err).is_err() {
                        continue;
                    }
                    if writer.write_all(&buf).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Error(err));
                    }
                }
                ClientOutbound::Welcome(welcome) => {
                    buf.clear();
                    if serde_json::to_writer(&mut buf, &welcome).is_err() {
                        continue;
                    }
                    if writer.write_all(&buf).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Welcome(welcome));
                    }
                }
                ClientOutbound::Observation(obs) => {
                    buf.clear();
                    if serde_json::to_writer(&mut buf, &obs).is_err() {
                        continue;
                    }
                    if writer.write_all(&buf).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Observation(obs));
                    }
                }
            }

            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    let mut line = String::new();

    // A failed read tears the connection down through the same cleanup as
    // a clean EOF; bailing out early would leave a stale controller.
    let result: anyhow::Result<()> = loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(e) => break Err(e.into()),
        };

        if bytes_read == 0 {
            // Client disconnected
            break Ok(());
        }

        let raw_line = line.trim_end_matches(|c| c == '\n' || c == '\r');
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(tx) = wire_log_tx.as_ref() {
            let _ = tx.send(WireRecord::Bytes(raw_line.as_bytes().to_vec()));
        }

        // Parse the message
        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                // Sequencing: enforce monotonic seq per sender.
                if is_handshaken(&state, client_id).await
                    && !check_and_update_seq(&state, client_id, hello.seq).await
                {
                    let error = create_error(
                        hello.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Validate protocol version
                if !hello.protocol_version.starts_with("1.") {
                    let error = create_error(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("Protocol version {} not supported", hello.protocol_version),
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    break Ok(());
                }

                // Mark client as handshaken.
                {
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                    }
                }

                // Assign a role: a free controller slot goes to the first
                // hello that does not ask to stay an observer.
                let wants_observer =
                    matches!(hello.requested.role, Some(RequestedRole::Observer));
                let (role, controller_id) = {
                    let mut controller = state.controller.write().await;
                    let role = if controller.is_none() && !wants_observer {
                        *controller = Some(client_id);
                        AssignedRole::Controller
                    } else {
                        AssignedRole::Observer
                    };
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.is_controller = role == AssignedRole::Controller;
                        client.stream_observations = hello.requested.stream_observations;
                    }
                    (role, *controller)
                };

                if role == AssignedRole::Controller {
                    println!("[Adapter] Client {} is now controller", client_id);
                }

                // Send welcome
                let welcome = create_welcome(
                    hello.seq,
                    &state.config.protocol_version,
                    client_id as u64,
                    role,
                    controller_id.map(|id| id as u64),
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                // Request an immediate snapshot for this client if desired.
                if hello.requested.stream_observations {
                    let _ = command_tx.try_send(InboundCommand {
                        client_id,
                        seq: hello.seq,
                        payload: InboundPayload::SnapshotRequest,
                    });
                }
            }

            Ok(ParsedMessage::Command(cmd)) => {
                // Handshake required.
                let handshaken = is_handshaken(&state, client_id).await;
                if !handshaken {
                    let error = create_error(
                        cmd.seq,
                        ErrorCode::HandshakeRequired,
                        "Send hello before command",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Sequencing: enforce monotonic seq per sender.
                if !check_and_update_seq(&state, client_id, cmd.seq).await {
                    let error = create_error(
                        cmd.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Check if client is controller
                let is_controller = {
                    let clients = state.clients.read().await;
                    clients
                        .iter()
                        .find(|c| c.id == client_id)
                        .map(|c| c.is_controller)
                        .unwrap_or(false)
                };

                if !is_controller {
                    let error = create_error(
                        cmd.seq,
                        ErrorCode::NotController,
                        "Only controller may send commands",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Map command into an inbound command for the host loop.
                let mapped = match map_command(&cmd) {
                    Ok(c) => c,
                    Err((code, message)) => {
                        let error = create_error(cmd.seq, code, &message);
                        let _ = tx.send(ClientOutbound::Error(error));
                        continue;
                    }
                };

                // Backpressure: bounded queue.
                match command_tx.try_send(InboundCommand {
                    client_id,
                    seq: cmd.seq,
                    payload: InboundPayload::Command(mapped),
                }) {
                    Ok(()) => {
                        // Ack will be sent by the host loop after the command is applied.
                    }
                    Err(_) => {
                        let error = create_error(
                            cmd.seq,
                            ErrorCode::Backpressure,
                            "Command queue is full",
                        );
                        let _ = tx.send(ClientOutbound::Error(error));
                    }
                }
            }

            Ok(ParsedMessage::Control(ctrl)) => {
                // Handshake required.
                let handshaken = is_handshaken(&state, client_id).await;
                if !handshaken {
                    let error = create_error(
                        ctrl.seq,
                        ErrorCode::HandshakeRequired,
                        "Send hello before control",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Sequencing: enforce monotonic seq per sender.
                if !check_and_update_seq(&state, client_id, ctrl.seq).await {
                    let error = create_error(
                        ctrl.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                match ctrl.action {
                    ControlAction::Claim => {
                        let mut controller = state.controller.write().await;
                        if controller.is_none() {
                            *controller = Some(client_id);
                            let mut clients = state.clients.write().await;
                            if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                                client.is_controller = true;
                            }
                            let ack = create_ack(ctrl.seq);
                            let _ = tx.send(ClientOutbound::Ack(ack));
                        } else {
                            let error = create_error(
                                ctrl.seq,
                                ErrorCode::ControllerActive,
                                "Controller already assigned",
                            );
                            let _ = tx.send(ClientOutbound::Error(error));
                        }
                    }
                    ControlAction::Release => {
                        let mut controller = state.controller.write().await;
                        if *controller == Some(client_id) {
                            *controller = None;
                            let mut clients = state.clients.write().await;
                            if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                                client.is_controller = false;
                            }
                            let ack = create_ack(ctrl.seq);
                            let _ = tx.send(ClientOutbound::Ack(ack));
                        } else {
                            let error = create_error(
                                ctrl.seq,
                                ErrorCode::NotController,
                                "Only controller may release",
                            );
                            let _ = tx.send(ClientOutbound::Error(error));
                        }
                    }
                }
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                let error = create_error(
                    seq,
                    ErrorCode::InvalidCommand,
                    &format!("JSON parse error: {}", e),
                );
                let _ = tx.send(ClientOutbound::Error(error));
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                let seq = unknown.seq;
                if is_handshaken(&state, client_id).await
                    && !check_and_update_seq(&state, client_id, seq).await
                {
                    let error = create_error(
                        seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }
                let error = create_error(seq, ErrorCode::InvalidCommand, "Unknown message type");
                let _ = tx.send(ClientOutbound::Error(error));
            }
        }
    };

    // Clean up: remove client and release/promote controller if needed.
    {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;

        let was_controller = *controller == Some(client_id);
        clients.retain(|c| c.id != client_id);

        if was_controller {
            // Promote the next available client (lowest id) to controller.
            let next_id = clients.iter().map(|c| c.id).min();
            *controller = next_id;
            if let Some(new_id) = next_id {
                if let Some(c) = clients.iter_mut().find(|c| c.id == new_id) {
                    c.is_controller = true;
                }
                println!("[Adapter] Controller {} promoted", new_id);
            } else {
                println!("[Adapter] Controller {} released", client_id);
            }
        }
    }

    // Cancel write task
    drop(tx);
    let _ = write_task.await;

    result
}

/// Map a protocol command onto a host command.
fn map_command(cmd: &CommandMessage) -> Result<ClientCommand, (ErrorCode, String)> {
    match cmd.op {
        OpName::Swap => {
            let Some(from) = cmd.from else {
                return Err((ErrorCode::InvalidSwap, "Missing from".to_string()));
            };
            let Some(to) = cmd.to else {
                return Err((ErrorCode::InvalidSwap, "Missing to".to_string()));
            };
            Ok(ClientCommand::Swap {
                from: Pos::new(from[0], from[1]),
                to: Pos::new(to[0], to[1]),
            })
        }
        OpName::Restart => Ok(ClientCommand::Restart { seed: cmd.seed }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap_command(from: Option<[u8; 2]>, to: Option<[u8; 2]>) -> CommandMessage {
        CommandMessage {
            msg_type: CommandType::default(),
            seq: 1,
            ts: 0,
            op: OpName::Swap,
            from,
            to,
            seed: None,
        }
    }

    #[test]
    fn swap_commands_need_both_endpoints() {
        let mapped = map_command(&swap_command(Some([0, 1]), Some([0, 2]))).unwrap();
        match mapped {
            ClientCommand::Swap { from, to } => {
                assert_eq!(from, Pos::new(0, 1));
                assert_eq!(to, Pos::new(0, 2));
            }
            other => panic!("expected swap, got {:?}", other),
        }

        let (code, _) = map_command(&swap_command(Some([0, 1]), None)).unwrap_err();
        assert_eq!(code, ErrorCode::InvalidSwap);
        let (code, _) = map_command(&swap_command(None, Some([0, 2]))).unwrap_err();
        assert_eq!(code, ErrorCode::InvalidSwap);
    }

    #[test]
    fn restart_passes_the_seed_through() {
        let cmd = CommandMessage {
            msg_type: CommandType::default(),
            seq: 2,
            ts: 0,
            op: OpName::Restart,
            from: None,
            to: None,
            seed: Some(7),
        };
        match map_command(&cmd).unwrap() {
            ClientCommand::Restart { seed } => assert_eq!(seed, Some(7)),
            other => panic!("expected restart, got {:?}", other),
        }
    }

    #[test]
    fn seq_extraction_survives_malformed_json() {
        assert_eq!(extract_seq_best_effort("{\"seq\": 42, \"type\":"), Some(42));
        assert_eq!(extract_seq_best_effort("{\"seq\":7}"), Some(7));
        assert_eq!(extract_seq_best_effort("{\"type\": \"hello\"}"), None);
        assert_eq!(extract_seq_best_effort("{\"seq\": \"not a number\"}"), None);
    }

    #[test]
    fn server_config_reads_the_environment() {
        // This test just ensures it doesn't panic
        let _config = ServerConfig::from_env();
    }
}
