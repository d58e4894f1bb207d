//! UDP GELF listener with chunk reassembly.

use gelf_codec::chunking::{is_chunked, ChunkReassembler};
use gelf_common::Message;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const MAX_DATAGRAM_SIZE: usize = 65_535;
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// Bind `port` and forward decoded messages into `out`. Runs until the
/// socket errors out or the process is torn down; callers drive this from
/// a `tokio::spawn`ed task.
pub async fn serve_udp(port: u16, out: mpsc::Sender<Message>) -> std::io::Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    info!(port, "listening for GELF UDP datagrams");

    let reassembler = Arc::new(ChunkReassembler::new());
    {
        let reassembler = Arc::clone(&reassembler);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let evicted = reassembler.sweep();
                if evicted > 0 {
                    debug!(evicted, "swept idle UDP chunk buffers");
                }
            }
        });
    }

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "udp recv_from failed");
                continue;
            }
        };
        let datagram = &buf[..len];

        let payload = if is_chunked(datagram) {
            match reassembler.ingest(datagram) {
                Ok(Some(complete)) => complete,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, %peer, "dropping malformed chunk");
                    continue;
                }
            }
        } else {
            datagram.to_vec()
        };

        match gelf_codec::decode(&payload) {
            Ok(message) => {
                if out.send(message).await.is_err() {
                    warn!("fan-in channel closed, stopping udp listener");
                    return Ok(());
                }
            }
            Err(e) => warn!(error = %e, %peer, "dropping undecodable udp message"),
        }
    }
}
