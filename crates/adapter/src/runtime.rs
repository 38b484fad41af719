//! Session hosting for the automation adapter.
//!
//! Owns the single authoritative [`LevelSession`] behind the TCP server.
//! Inbound commands are applied strictly one at a time; every committed
//! change is answered with an ack to the sender plus an observation
//! broadcast to all connected clients.

use std::hash::{Hash, Hasher};

use tokio::sync::mpsc;

use crate::protocol::{
    create_ack, create_error, current_timestamp_ms, AckMessage, ConfigSnapshot, ErrorCode,
    ErrorMessage, FallStep, GridSnapshot, LastSwap, ObservationMessage, ObservationType,
    RefillStep, StateHash, StatusName, SwapRound, TileKindName,
};
use lumina_match_core::{LevelSession, Resolution, SessionSnapshot, SwapError};
use lumina_match_types::{ConfigError, LevelConfig, Pos, SessionStatus};

/// Command delivered to the session host.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

/// What the client asked the host to do.
#[derive(Debug, Clone)]
pub enum InboundPayload {
    Command(ClientCommand),
    /// Deliver a fresh observation to this client only.
    SnapshotRequest,
}

/// Validated command payload.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    Swap { from: Pos, to: Pos },
    Restart { seed: Option<u32> },
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClientAck { client_id: usize, ack: AckMessage },
    ToClientError { client_id: usize, err: ErrorMessage },
    ToClientObservation {
        client_id: usize,
        obs: ObservationMessage,
    },
    BroadcastObservation { obs: ObservationMessage },
}

/// Host-side level configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub level: LevelConfig,
    /// Fixed seed for reproducible sessions. `None` derives one from the clock.
    pub seed: Option<u32>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            level: LevelConfig::default(),
            seed: None,
        }
    }
}

impl HostConfig {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = LevelConfig::default();
        let grid_size = env::var("LUMINA_MATCH_GRID_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.grid_size);
        let color_count = env::var("LUMINA_MATCH_COLOR_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.color_count);
        let target_score = env::var("LUMINA_MATCH_TARGET_SCORE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.target_score);
        let move_budget = env::var("LUMINA_MATCH_MOVE_BUDGET")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.move_budget);
        let seed = env::var("LUMINA_MATCH_SEED")
            .ok()
            .and_then(|s| s.parse().ok());

        Self {
            level: LevelConfig::new(grid_size, color_count, target_score, move_budget),
            seed,
        }
    }
}

/// Stable 64-bit FNV-1a hasher for deterministic `state_hash`.
///
/// We avoid `DefaultHasher` here since its output is not guaranteed stable
/// across Rust versions/platforms.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// The session being exposed over the wire, plus the bookkeeping the
/// protocol needs on top of it.
pub struct SessionHost {
    session: LevelSession,
    snapshot: SessionSnapshot,
    last_swap: Option<LastSwap>,
    obs_seq: u64,
}

impl SessionHost {
    /// Build a fresh session from host configuration.
    pub fn new(config: &HostConfig) -> Result<Self, ConfigError> {
        let seed = config.seed.unwrap_or_else(seed_from_clock);
        Ok(Self::with_session(LevelSession::new(config.level, seed)?))
    }

    /// Host an already-built session.
    pub fn with_session(session: LevelSession) -> Self {
        Self {
            session,
            snapshot: SessionSnapshot::default(),
            last_swap: None,
            obs_seq: 0,
        }
    }

    pub fn session(&self) -> &LevelSession {
        &self.session
    }

    /// Apply one validated command to the session.
    ///
    /// A committed swap records its full resolution for the next
    /// observation's `last_swap` field; a restart discards it.
    pub fn apply(&mut self, command: &ClientCommand) -> Result<(), SwapError> {
        match command {
            ClientCommand::Swap { from, to } => {
                let resolution = self.session.attempt_swap(*from, *to)?;
                self.last_swap = Some(build_last_swap(*from, *to, &resolution));
                Ok(())
            }
            ClientCommand::Restart { seed } => {
                let seed = seed.unwrap_or_else(seed_from_clock);
                self.session.restart(seed);
                self.last_swap = None;
                Ok(())
            }
        }
    }

    /// Build the next observation. Each call consumes one observation seq.
    pub fn observation(&mut self) -> ObservationMessage {
        self.obs_seq += 1;
        self.session.snapshot_into(&mut self.snapshot);
        build_observation(&self.snapshot, self.obs_seq, self.last_swap.clone())
    }
}

/// Build an observation message from a session snapshot.
pub fn build_observation(
    snapshot: &SessionSnapshot,
    seq: u64,
    last_swap: Option<LastSwap>,
) -> ObservationMessage {
    // The snapshot hashes as one unit: cells, config, counters, status.
    let mut hasher = Fnv1aHasher::new();
    snapshot.hash(&mut hasher);
    // Include last_swap since it is part of the observation payload.
    last_swap.is_some().hash(&mut hasher);
    if let Some(swap) = last_swap.as_ref() {
        swap.from.hash(&mut hasher);
        swap.to.hash(&mut hasher);
        swap.score_delta.hash(&mut hasher);
        swap.rounds.len().hash(&mut hasher);
    }
    let state_hash = StateHash(hasher.finish());

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        playable: snapshot.playable(),
        status: StatusName::from(snapshot.status),
        session_id: snapshot.session_id,
        seed: snapshot.seed,
        swaps_made: snapshot.swaps_made,
        grid: GridSnapshot {
            size: snapshot.grid_size,
            cells: snapshot.cells,
        },
        config: ConfigSnapshot {
            grid_size: snapshot.grid_size,
            color_count: snapshot.color_count,
            target_score: snapshot.target_score,
            move_budget: snapshot.move_budget,
        },
        score: snapshot.score,
        moves_left: snapshot.moves_left,
        last_swap,
        state_hash,
    }
}

/// Run the host loop until every command sender hangs up.
pub async fn run_host(
    mut host: SessionHost,
    mut cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
) {
    while let Some(inbound) = cmd_rx.recv().await {
        match inbound.payload {
            InboundPayload::SnapshotRequest => {
                let obs = host.observation();
                let _ = out_tx.send(OutboundMessage::ToClientObservation {
                    client_id: inbound.client_id,
                    obs,
                });
            }
            InboundPayload::Command(command) => {
                let was = host.session().status();
                match host.apply(&command) {
                    Ok(()) => {
                        let now = host.session().status();
                        if was == SessionStatus::InProgress && now != was {
                            println!(
                                "[Host] session {} finished: {} with score {}",
                                host.session().session_id(),
                                now.as_str(),
                                host.session().score()
                            );
                        }
                        if let ClientCommand::Restart { .. } = command {
                            println!(
                                "[Host] session {} started (seed {})",
                                host.session().session_id(),
                                host.session().seed()
                            );
                        }

                        let ack = create_ack(inbound.seq);
                        let _ = out_tx.send(OutboundMessage::ToClientAck {
                            client_id: inbound.client_id,
                            ack,
                        });
                        let obs = host.observation();
                        let _ = out_tx.send(OutboundMessage::BroadcastObservation { obs });
                    }
                    Err(err) => {
                        let err = create_error(inbound.seq, reject_code(&err), err.message());
                        let _ = out_tx.send(OutboundMessage::ToClientError {
                            client_id: inbound.client_id,
                            err,
                        });
                    }
                }
            }
        }
    }
}

/// Wire error code for a rejected swap.
fn reject_code(err: &SwapError) -> ErrorCode {
    match err {
        SwapError::OutOfBounds | SwapError::NotAdjacent | SwapError::Vacant => {
            ErrorCode::InvalidSwap
        }
        SwapError::NoMatch => ErrorCode::NoMatchSwap,
        SwapError::SessionOver => ErrorCode::SessionOver,
    }
}

fn build_last_swap(from: Pos, to: Pos, resolution: &Resolution) -> LastSwap {
    let rounds = resolution
        .rounds
        .iter()
        .map(|round| SwapRound {
            cleared: round.cleared.iter().map(|p| [p.row, p.col]).collect(),
            falls: round
                .falls
                .iter()
                .map(|fall| FallStep {
                    from: [fall.from.row, fall.from.col],
                    to: [fall.to.row, fall.to.col],
                })
                .collect(),
            refills: round
                .refills
                .iter()
                .map(|refill| RefillStep {
                    at: [refill.at.row, refill.at.col],
                    kind: TileKindName::from(refill.kind),
                })
                .collect(),
            points: round.points.total,
        })
        .collect();

    LastSwap {
        from: [from.row, from.col],
        to: [to.row, to.col],
        score_delta: resolution.score_delta,
        rounds,
    }
}

fn seed_from_clock() -> u32 {
    current_timestamp_ms() as u32
}
