//! TCP GELF listener: each connection carries one full, possibly
//! compressed GELF message; the server reads the connection to EOF, then
//! decodes.

use gelf_common::Message;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Bind `port` and forward decoded messages into `out`, spawning one task
/// per accepted connection.
pub async fn serve_tcp(port: u16, out: mpsc::Sender<Message>) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening for GELF TCP connections");

    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "tcp accept failed");
                continue;
            }
        };
        let out = out.clone();

        tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Err(e) = stream.read_to_end(&mut buf).await {
                warn!(error = %e, %peer, "error reading tcp connection");
                return;
            }
            match gelf_codec::decode(&buf) {
                Ok(message) => {
                    if out.send(message).await.is_err() {
                        warn!("fan-in channel closed, dropping tcp message");
                    }
                }
                Err(e) => warn!(error = %e, %peer, "error unboxing tcp gelf message"),
            }
        });
    }
}
