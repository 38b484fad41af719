//! Read-only observer client (`lumina-match observe`).
//!
//! Connects to a running host over TCP, performs the handshake as an
//! observer, and prints every observation as it arrives. Debug tooling,
//! not a display surface.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use anyhow::{anyhow, Result};

use lumina_match::adapter::protocol::{
    create_hello, GridSnapshot, LastSwap, ObservationMessage, RequestedRole, StatusName,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserveConfig {
    pub host: String,
    pub port: u16,
}

pub fn parse_observe_args(args: &[String]) -> Result<Option<ObserveConfig>> {
    if args.is_empty() || args[0] != "observe" {
        return Ok(None);
    }

    let mut host = String::from("127.0.0.1");
    let mut port: u16 = 7777;
    let mut i = 1usize;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| anyhow!("observe: missing value for --host"))?;
                host = v.clone();
            }
            "--port" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| anyhow!("observe: missing value for --port"))?;
                port = v
                    .parse::<u16>()
                    .map_err(|_| anyhow!("observe: invalid --port value: {}", v))?;
            }
            other => {
                return Err(anyhow!("observe: unknown argument: {}", other));
            }
        }
        i += 1;
    }

    Ok(Some(ObserveConfig { host, port }))
}

#[derive(Debug, Clone)]
enum ServerLine {
    Welcome {
        role: String,
        controller: Option<u64>,
    },
    Observation(ObservationMessage),
    ServerError {
        code: String,
        message: String,
    },
}

pub fn run(config: &ObserveConfig) -> Result<()> {
    let mut stream = TcpStream::connect((config.host.as_str(), config.port)).map_err(|e| {
        anyhow!(
            "observe: connect {}:{} failed: {}",
            config.host,
            config.port,
            e
        )
    })?;
    stream
        .set_nodelay(true)
        .map_err(|e| anyhow!("observe: set_nodelay failed: {}", e))?;

    let hello = create_hello(1, "lumina-match-observe", "1.0.0", RequestedRole::Observer);
    let line = serde_json::to_string(&hello)?;
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    println!("[Observe] connected to {}:{}", config.host, config.port);

    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line.map_err(|e| anyhow!("observe: read error: {}", e))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_server_line(&line) {
            Some(ServerLine::Welcome { role, controller }) => match controller {
                Some(id) => println!("[Observe] welcome: role {}, controller {}", role, id),
                None => println!("[Observe] welcome: role {}, no controller", role),
            },
            Some(ServerLine::Observation(obs)) => print_observation(&obs),
            Some(ServerLine::ServerError { code, message }) => {
                println!("[Observe] server error {}: {}", code, message);
            }
            None => {}
        }
    }

    println!("[Observe] connection closed");
    Ok(())
}

fn print_observation(obs: &ObservationMessage) {
    println!("[Observe] {}", describe_observation(obs));
    if let Some(swap) = obs.last_swap.as_ref() {
        println!("[Observe]   {}", describe_last_swap(swap));
    }
    for row in grid_rows(&obs.grid) {
        println!("[Observe]   {}", row);
    }
}

fn describe_observation(obs: &ObservationMessage) -> String {
    let status = match obs.status {
        StatusName::InProgress => "in progress",
        StatusName::Cleared => "cleared",
        StatusName::Failed => "failed",
    };
    format!(
        "session {} ({}): score {}/{}, moves left {}, swaps {}, seed {}",
        obs.session_id,
        status,
        obs.score,
        obs.config.target_score,
        obs.moves_left,
        obs.swaps_made,
        obs.seed
    )
}

fn describe_last_swap(swap: &LastSwap) -> String {
    let cleared: usize = swap.rounds.iter().map(|r| r.cleared.len()).sum();
    format!(
        "last swap ({},{}) -> ({},{}): +{} points, rounds {}, cleared {}",
        swap.from[0],
        swap.from[1],
        swap.to[0],
        swap.to[1],
        swap.score_delta,
        swap.rounds.len(),
        cleared
    )
}

/// Render the live square of the grid, one string per row. Empty cells
/// print as `.`, tiles as their codes.
fn grid_rows(grid: &GridSnapshot) -> Vec<String> {
    let size = grid.size as usize;
    let mut rows = Vec::with_capacity(size);
    for row in grid.cells.iter().take(size) {
        let mut s = String::with_capacity(size);
        for &cell in row.iter().take(size) {
            s.push(if cell == 0 {
                '.'
            } else {
                (b'0' + cell) as char
            });
        }
        rows.push(s);
    }
    rows
}

fn parse_server_line(line: &str) -> Option<ServerLine> {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Some(ServerLine::ServerError {
                code: "invalid_json".to_string(),
                message: e.to_string(),
            })
        }
    };
    let msg_type = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match msg_type {
        "welcome" => {
            let role = value
                .get("role")
                .and_then(|v| v.as_str())
                .unwrap_or("observer")
                .to_string();
            let controller = value.get("controller_id").and_then(|v| v.as_u64());
            Some(ServerLine::Welcome { role, controller })
        }
        "observation" => match serde_json::from_str::<ObservationMessage>(line) {
            Ok(obs) => Some(ServerLine::Observation(obs)),
            Err(e) => Some(ServerLine::ServerError {
                code: "invalid_observation".to_string(),
                message: e.to_string(),
            }),
        },
        "error" => {
            let code = value
                .get("code")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            let message = value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            Some(ServerLine::ServerError { code, message })
        }
        _ => None,
    }
}
