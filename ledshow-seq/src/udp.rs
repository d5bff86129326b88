//! UDP song-name receiver.
//!
//! A controller on the network announces the next song as a single JSON
//! datagram: `{"song": "jungle"}`. The menu blocks on one announcement
//! with a timeout and hands the validated base name back for the usual
//! confirm-and-play flow.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::net::UdpSocket;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SongAnnounce {
    song: String,
}

/// Bind the announcement port and wait for one song name.
pub fn receive_song(port: u16, timeout: Duration) -> Result<String> {
    let socket = UdpSocket::bind(("0.0.0.0", port))?;
    socket.set_read_timeout(Some(timeout))?;
    recv_announcement(&socket)
}

/// Receive and validate one announcement on an already-bound socket.
fn recv_announcement(socket: &UdpSocket) -> Result<String> {
    let mut buf = [0u8; 512];
    let (len, peer) = socket
        .recv_from(&mut buf)
        .map_err(|e| Error::Udp(format!("no announcement received: {e}")))?;

    let announce: SongAnnounce = serde_json::from_slice(&buf[..len])
        .map_err(|e| Error::Udp(format!("bad announcement from {peer}: {e}")))?;

    let song = announce.song.trim().to_string();
    if song.is_empty()
        || song.contains('/')
        || song.contains('\\')
        || song.contains("..")
    {
        return Err(Error::Udp(format!("invalid song name {song:?} from {peer}")));
    }

    info!("UDP announcement from {peer}: '{song}'");
    Ok(song)
}
