// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness probes: a raw RCON connect check and a Minecraft protocol
//! status handshake, each bounded to a short timeout so they never stall
//! the reconciliation loops that call them.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Every liveness probe gives up after this long and is treated as "not yet
/// healthy" rather than propagating an error.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Returns `true` if a TCP connection to the RCON port succeeds within
/// [`PROBE_TIMEOUT`]. A full SERVERDATA_AUTH handshake would require the
/// configured RCON password; callers that have it can layer that on, but a
/// bare connect is sufficient to distinguish "process is accepting
/// connections" from "still starting up".
pub async fn probe_rcon(addr: SocketAddr) -> bool {
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// Performs a Minecraft server-list-ping handshake: connect, send a
/// handshake packet with `next_state = 1` (status), send an empty status
/// request, and confirm a well-formed length-prefixed JSON response comes
/// back. Returns `true` only if the full round trip succeeds within
/// [`PROBE_TIMEOUT`].
pub async fn probe_game_port(addr: SocketAddr) -> bool {
    tokio::time::timeout(PROBE_TIMEOUT, probe_game_port_inner(addr))
        .await
        .map(|r| r.unwrap_or(false))
        .unwrap_or(false)
}

async fn probe_game_port_inner(addr: SocketAddr) -> io::Result<bool> {
    let mut stream = TcpStream::connect(addr).await?;

    let mut handshake = Vec::new();
    write_varint(&mut handshake, 0x00); // packet id: handshake
    write_varint(&mut handshake, 760); // protocol version (1.20.x); server ignores for status
    write_string(&mut handshake, &addr.ip().to_string());
    handshake.extend_from_slice(&addr.port().to_be_bytes());
    write_varint(&mut handshake, 1); // next_state = status
    write_framed_packet(&mut stream, &handshake).await?;

    // Empty status request packet (id 0x00, no body).
    let mut status_request = Vec::new();
    write_varint(&mut status_request, 0x00);
    write_framed_packet(&mut stream, &status_request).await?;

    let length = read_varint(&mut stream).await?;
    if length <= 0 || length > 1_048_576 {
        return Ok(false);
    }
    let mut body = vec![0u8; length as usize];
    stream.read_exact(&mut body).await?;
    // First byte(s) of the body are the packet id varint (0x00 for status
    // response); what follows is a varint-prefixed JSON string. We don't
    // need to parse the JSON to confirm liveness, just that the server
    // answered with a plausible status packet.
    Ok(!body.is_empty())
}

async fn write_framed_packet(stream: &mut TcpStream, payload: &[u8]) -> io::Result<()> {
    let mut framed = Vec::new();
    write_varint(&mut framed, payload.len() as i32);
    framed.extend_from_slice(payload);
    stream.write_all(&framed).await
}

fn write_varint(buf: &mut Vec<u8>, mut value: i32) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u32) >> 7) as i32;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as i32);
    buf.extend_from_slice(s.as_bytes());
}

async fn read_varint(stream: &mut TcpStream) -> io::Result<i32> {
    let mut result: i32 = 0;
    for i in 0..5 {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).await?;
        result |= ((byte[0] & 0x7F) as i32) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(io::Error::new(io::ErrorKind::InvalidData, "varint too long"))
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
