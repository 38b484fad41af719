//! Automation adapter - remote puzzle control via TCP socket with JSON protocol
//!
//! This crate lets external automation clients (solvers, test harnesses,
//! bots) drive a match-3 session through a TCP socket connection and watch
//! every resolution play out as structured observations.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7777)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: First client to hello becomes the controller
//!    (unless it asks to stay an observer)
//! 4. **Observation Streaming**: Server sends a session observation after
//!    every committed command
//! 5. **Commanding**: Controller sends swap and restart operations
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: Initial handshake with client info and requested capabilities
//! - **command**: Execute one operation (`swap` or `restart`)
//! - **control**: Claim or release controller status
//!
//! ## Server → Client
//!
//! - **welcome**: Response to hello with assigned role and server capabilities
//! - **observation**: Full session snapshot (grid, score, moves left, status,
//!   last swap trace, state hash)
//! - **ack**: Command acknowledgment, sent after the command is applied
//! - **error**: Error response with code and message
//!
//! # Operations
//!
//! - **swap**: `{"op":"swap","from":[row,col],"to":[row,col]}` - exchange two
//!   adjacent tiles; rejected with `invalid_swap` / `no_match_swap` /
//!   `session_over` when the engine refuses it
//! - **restart**: `{"op":"restart","seed":123}` - abandon the session and
//!   regenerate (seed optional)
//!
//! # Environment Variables
//!
//! Configure the adapter using environment variables:
//!
//! - `LUMINA_MATCH_HOST`: Bind address (default: "127.0.0.1")
//! - `LUMINA_MATCH_PORT`: Port number (default: 7777)
//! - `LUMINA_MATCH_MAX_PENDING`: Command queue depth before backpressure
//!   errors (default: 10)
//! - `LUMINA_MATCH_DISABLED`: Set to "1" or "true" to disable adapter entirely
//! - `LUMINA_MATCH_LOG_PATH`: Append every wire line to this file
//!
//! The level itself is configured through `LUMINA_MATCH_GRID_SIZE`,
//! `LUMINA_MATCH_COLOR_COUNT`, `LUMINA_MATCH_TARGET_SCORE`,
//! `LUMINA_MATCH_MOVE_BUDGET`, and `LUMINA_MATCH_SEED`; see [`runtime`].
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":1234567890,"client":{"name":"my-bot","version":"0.1.0"},"protocol_version":"1.0.0","formats":["json"],"requested":{"stream_observations":true}}
//! Server -> Client: {"type":"welcome","seq":1,"ts":1234567890,"protocol_version":"1.0.0","client_id":1,"role":"controller",...}
//! Server -> Client: {"type":"observation","seq":1,"ts":1234567891,"grid":{"size":6,...},"score":0,"moves_left":15,...}
//! Client -> Server: {"type":"command","seq":2,"ts":1234567892,"op":"swap","from":[2,2],"to":[2,3]}
//! Server -> Client: {"type":"ack","seq":2,"ts":1234567892,"status":"ok"}
//! Server -> Client: {"type":"observation","seq":2,"ts":1234567893,"score":30,"last_swap":{...},...}
//! ```
//!
//! # Implementation
//!
//! - Uses **tokio** for async networking
//! - Multiple clients can connect (only one controller at a time)
//! - Controller can release control for another client to take over
//! - Commands are applied one at a time by the session host loop
//! - See [`protocol`] for message structure definitions
//! - See [`server`] for the TCP server implementation
//! - See [`runtime`] for the session host loop
//!
//! # Testing
//!
//! Connect to the adapter using netcat for manual testing:
//!
//! ```bash
//! nc 127.0.0.1 7777
//! {"type":"hello","seq":1,"ts":1234567890,"client":{"name":"test","version":"0.1.0"},"protocol_version":"1.0.0","formats":["json"],"requested":{"stream_observations":true}}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use lumina_match_core as core;
pub use lumina_match_types as types;

// Re-export protocol types for convenience
pub use protocol::*;
pub use runtime::{
    build_observation, run_host, ClientCommand, HostConfig, InboundCommand, InboundPayload,
    OutboundMessage, SessionHost,
};
pub use server::*;
