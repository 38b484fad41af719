use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use lumina_match::adapter::protocol::{create_hello, RequestedRole};
use lumina_match::adapter::server::{run_server, ServerConfig};
use lumina_match::adapter::{run_host, HostConfig, InboundCommand, OutboundMessage, SessionHost};
use lumina_match::core::{has_live_match, Grid, LevelSession};
use lumina_match::types::{LevelConfig, Pos, TileKind};

async fn read_line(
    lines: &mut tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
) -> String {
    tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timeout waiting for line")
        .expect("io error")
        .expect("expected line")
}

fn grid_from_rows(rows: &[&str]) -> Grid {
    let mut grid = Grid::empty(rows.len() as u8);
    for (row, line) in rows.iter().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            let cell = match ch {
                '.' => None,
                '1'..='7' => TileKind::from_index(ch as u8 - b'1'),
                other => panic!("unexpected cell char {:?}", other),
            };
            grid.set(row as u8, col as u8, cell);
        }
    }
    grid
}

/// Rebuild the board a client sees from an observation's wire cells.
fn grid_from_observation(obs: &serde_json::Value) -> Grid {
    let size = obs["grid"]["size"].as_u64().expect("grid size") as u8;
    let mut grid = Grid::empty(size);
    for row in 0..size {
        for col in 0..size {
            let v = obs["grid"]["cells"][row as usize][col as usize]
                .as_u64()
                .expect("grid cell") as u8;
            if v > 0 {
                grid.set(row, col, TileKind::from_index(v - 1));
            }
        }
    }
    grid
}

/// First adjacent exchange that would create a run, probing row-major.
fn find_live_swap(grid: &Grid) -> Option<(Pos, Pos)> {
    let size = grid.size();
    let mut probe = grid.clone();
    for row in 0..size {
        for col in 0..size {
            let here = Pos::new(row, col);
            for neighbor in [Pos::new(row, col + 1), Pos::new(row + 1, col)] {
                if neighbor.row >= size || neighbor.col >= size {
                    continue;
                }
                probe.swap(here, neighbor);
                let live = has_live_match(&probe);
                probe.swap(here, neighbor);
                if live {
                    return Some((here, neighbor));
                }
            }
        }
    }
    None
}

#[tokio::test]
async fn closed_loop_swap_ack_then_observation() {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        protocol_version: "1.0.0".to_string(),
        max_pending_commands: 64,
        log_path: None,
    };

    let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(128);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ready_tx, ready_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        let _ = run_server(config, cmd_tx, out_rx, Some(ready_tx)).await;
    });

    // Swapping (2,2) and (2,3) on this board clears exactly one run of
    // three for 30 points; seed 99 drives the refills.
    let session = LevelSession::with_grid(
        LevelConfig::new(6, 3, 1000, 15),
        grid_from_rows(&[
            "123123", //
            "231312", //
            "321211", //
            "132323", //
            "213131", //
            "321212",
        ]),
        99,
    )
    .unwrap();
    let host_handle = tokio::spawn(run_host(SessionHost::with_session(session), cmd_rx, out_tx));

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .unwrap()
        .unwrap();

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let hello = create_hello(1, "closed-loop", "1.0.0", RequestedRole::Auto);
    write_half
        .write_all(serde_json::to_string(&hello).unwrap().as_bytes())
        .await
        .unwrap();
    write_half.write_all(b"\n").await.unwrap();
    write_half.flush().await.unwrap();

    let welcome: serde_json::Value = serde_json::from_str(&read_line(&mut lines).await).unwrap();
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["role"], "controller");

    // First observation comes from the hello's snapshot request.
    let obs: serde_json::Value = serde_json::from_str(&read_line(&mut lines).await).unwrap();
    assert_eq!(obs["type"], "observation");
    assert_eq!(obs["seq"], 1);
    assert_eq!(obs["session_id"], 1);
    assert_eq!(obs["score"], 0);
    assert_eq!(obs["playable"], true);
    assert_eq!(obs["grid"]["cells"][2][3], 2);

    // Committed swap: ack, then the broadcast with the full replay.
    let cmd = r#"{"type":"command","seq":2,"ts":1,"op":"swap","from":[2,2],"to":[2,3]}"#;
    write_half.write_all(cmd.as_bytes()).await.unwrap();
    write_half.write_all(b"\n").await.unwrap();
    write_half.flush().await.unwrap();

    let ack: serde_json::Value = serde_json::from_str(&read_line(&mut lines).await).unwrap();
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["seq"], 2);

    let obs: serde_json::Value = serde_json::from_str(&read_line(&mut lines).await).unwrap();
    assert_eq!(obs["type"], "observation");
    assert_eq!(obs["seq"], 2);
    assert_eq!(obs["score"], 30);
    assert_eq!(obs["moves_left"], 14);
    assert_eq!(obs["swaps_made"], 1);
    let last_swap = &obs["last_swap"];
    assert_eq!(last_swap["from"], serde_json::json!([2, 2]));
    assert_eq!(last_swap["to"], serde_json::json!([2, 3]));
    assert_eq!(last_swap["score_delta"], 30);
    assert_eq!(last_swap["rounds"].as_array().unwrap().len(), 1);
    assert_eq!(
        last_swap["rounds"][0]["cleared"],
        serde_json::json!([[2, 3], [2, 4], [2, 5]])
    );
    assert_eq!(last_swap["rounds"][0]["points"], 30);
    assert_eq!(last_swap["rounds"][0]["falls"].as_array().unwrap().len(), 6);
    assert_eq!(last_swap["rounds"][0]["refills"].as_array().unwrap().len(), 3);

    // Rejected swaps answer with a typed error and broadcast nothing.
    let cmd = r#"{"type":"command","seq":3,"ts":1,"op":"swap","from":[0,0],"to":[1,1]}"#;
    write_half.write_all(cmd.as_bytes()).await.unwrap();
    write_half.write_all(b"\n").await.unwrap();
    write_half.flush().await.unwrap();

    let err: serde_json::Value = serde_json::from_str(&read_line(&mut lines).await).unwrap();
    assert_eq!(err["type"], "error");
    assert_eq!(err["seq"], 3);
    assert_eq!(err["code"], "invalid_swap");

    // Restart hands out a fresh board under the requested seed.
    let cmd = r#"{"type":"command","seq":4,"ts":1,"op":"restart","seed":123}"#;
    write_half.write_all(cmd.as_bytes()).await.unwrap();
    write_half.write_all(b"\n").await.unwrap();
    write_half.flush().await.unwrap();

    let ack: serde_json::Value = serde_json::from_str(&read_line(&mut lines).await).unwrap();
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["seq"], 4);

    let obs: serde_json::Value = serde_json::from_str(&read_line(&mut lines).await).unwrap();
    assert_eq!(obs["type"], "observation");
    assert_eq!(obs["session_id"], 2);
    assert_eq!(obs["seed"], 123);
    assert_eq!(obs["score"], 0);
    assert_eq!(obs["moves_left"], 15);
    assert!(obs.get("last_swap").is_none(), "restart drops the replay");

    server_handle.abort();
    host_handle.abort();
}

#[tokio::test]
async fn closed_loop_drives_swaps_from_observations() {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        protocol_version: "1.0.0".to_string(),
        max_pending_commands: 64,
        log_path: None,
    };

    let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(128);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ready_tx, ready_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        let _ = run_server(config, cmd_tx, out_rx, Some(ready_tx)).await;
    });

    // A budget no rollout here can exhaust, so the session stays playable.
    let host_config = HostConfig {
        level: LevelConfig::new(6, 3, 1_000_000, 1_000_000),
        seed: Some(7),
    };
    let host = SessionHost::new(&host_config).unwrap();
    let host_handle = tokio::spawn(run_host(host, cmd_rx, out_tx));

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .unwrap()
        .unwrap();

    // Reconnect every episode; the session carries over.
    for _episode in 0..3 {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let mut seq: u64 = 1;
        let hello = create_hello(seq, "closed-loop", "1.0.0", RequestedRole::Auto);
        write_half
            .write_all(serde_json::to_string(&hello).unwrap().as_bytes())
            .await
            .unwrap();
        write_half.write_all(b"\n").await.unwrap();
        write_half.flush().await.unwrap();

        let welcome: serde_json::Value =
            serde_json::from_str(&read_line(&mut lines).await).unwrap();
        assert_eq!(welcome["type"], "welcome");
        assert_eq!(welcome["role"], "controller");

        let mut obs: serde_json::Value =
            serde_json::from_str(&read_line(&mut lines).await).unwrap();
        assert_eq!(obs["type"], "observation");
        assert_eq!(obs["playable"], true);

        for _step in 0..15 {
            let board = grid_from_observation(&obs);
            let command = match find_live_swap(&board) {
                Some((a, b)) => serde_json::json!({
                    "type": "command",
                    "seq": seq + 1,
                    "ts": 1,
                    "op": "swap",
                    "from": [a.row, a.col],
                    "to": [b.row, b.col],
                }),
                // Generated boards can come up with no live swap; reroll.
                None => serde_json::json!({
                    "type": "command",
                    "seq": seq + 1,
                    "ts": 1,
                    "op": "restart",
                }),
            };
            seq += 1;
            let swapping = command["op"] == "swap";
            let score_before = obs["score"].as_u64().unwrap();

            write_half
                .write_all(serde_json::to_string(&command).unwrap().as_bytes())
                .await
                .unwrap();
            write_half.write_all(b"\n").await.unwrap();
            write_half.flush().await.unwrap();

            let ack: serde_json::Value =
                serde_json::from_str(&read_line(&mut lines).await).unwrap();
            assert_eq!(ack["type"], "ack", "probed command should apply: {}", ack);
            assert_eq!(ack["seq"], seq);

            obs = serde_json::from_str(&read_line(&mut lines).await).unwrap();
            assert_eq!(obs["type"], "observation");
            assert_eq!(obs["playable"], true);
            if swapping {
                assert!(
                    obs["score"].as_u64().unwrap() > score_before,
                    "a committed swap always scores"
                );
            } else {
                assert_eq!(obs["score"], 0);
            }
        }

        drop(write_half);
        drop(lines);
        // Give the server time to notice the disconnect and free the
        // controller slot before the next episode claims it.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    server_handle.abort();
    host_handle.abort();
}
