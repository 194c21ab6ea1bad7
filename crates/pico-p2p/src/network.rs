//! One-shot TCP gossip transport.
//!
//! Each logical message is an independent connection: the sender dials,
//! writes the whole zlib frame, closes. The receiver reads to EOF, inflates
//! and parses. Per-peer dial failures are swallowed; resilience comes from
//! the confirmation protocol's retransmissions, not from retries here.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pico_core::constants::{CONNECT_TIMEOUT_SECS, MAX_FRAME_BYTES, READ_TIMEOUT_SECS};

use crate::config::NetConfig;
use crate::message::Envelope;
use crate::peer::Peer;

// ── Outbound ─────────────────────────────────────────────────────────────────

/// Best-effort broadcast of one envelope to every peer except self.
pub async fn broadcast(peers: &[Peer], local: Option<&Peer>, envelope: &Envelope) {
    let frame = envelope.to_frame();
    for peer in peers {
        if local.is_some_and(|me| me.ipv6 == peer.ipv6 && me.port == peer.port) {
            continue;
        }
        if let Err(e) = send_frame(peer, &frame).await {
            debug!(peer = %peer, error = %e, "peer unreachable");
        }
    }
}

async fn send_frame(peer: &Peer, frame: &[u8]) -> std::io::Result<()> {
    let ip: IpAddr = peer
        .ipv6
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let addr = SocketAddr::new(ip, peer.port);

    let mut stream = tokio::time::timeout(
        Duration::from_secs(CONNECT_TIMEOUT_SECS),
        TcpStream::connect(addr),
    )
    .await
    .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))??;

    stream.write_all(frame).await?;
    stream.shutdown().await
}

// ── Inbound ──────────────────────────────────────────────────────────────────

/// The accept loop. Binds per `config` and pipes every decoded envelope
/// into `inbound`; malformed or oversized frames are dropped with a log
/// line. Returns only when the channel closes.
pub struct Listener {
    listener: TcpListener,
}

impl Listener {
    pub async fn bind(config: &NetConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind((config.listen_addr.as_str(), config.port)).await?;
        info!(addr = %listener.local_addr()?, "gossip listening");
        Ok(Self { listener })
    }

    /// The port actually bound (relevant when configured with port 0).
    pub fn port(&self) -> std::io::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    pub async fn run(self, inbound: mpsc::Sender<Envelope>) {
        loop {
            let (stream, remote) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let inbound = inbound.clone();
            tokio::spawn(async move {
                match read_envelope(stream).await {
                    Ok(envelope) => {
                        if inbound.send(envelope).await.is_err() {
                            debug!("inbound channel closed; dropping frame");
                        }
                    }
                    Err(e) => debug!(peer = %remote, error = %e, "dropping inbound frame"),
                }
            });
        }
    }
}

/// Read one connection to EOF (bounded in size and time) and decode it.
async fn read_envelope(mut stream: TcpStream) -> Result<Envelope, pico_core::PicoError> {
    let mut frame = Vec::new();
    tokio::time::timeout(
        Duration::from_secs(READ_TIMEOUT_SECS),
        (&mut stream).take(MAX_FRAME_BYTES as u64 + 1).read_to_end(&mut frame),
    )
    .await
    .map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::TimedOut, "peer stalled mid-frame")
    })??;

    if frame.len() > MAX_FRAME_BYTES {
        return Err(pico_core::PicoError::FrameTooLarge {
            max: MAX_FRAME_BYTES,
        });
    }
    Envelope::from_frame(&frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> NetConfig {
        NetConfig {
            listen_addr: "::1".into(),
            port: 0,
            self_addr: None,
        }
    }

    #[tokio::test]
    async fn frame_travels_end_to_end() {
        let listener = Listener::bind(&loopback_config()).await.unwrap();
        let port = listener.port().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(listener.run(tx));

        let envelope = Envelope::peers(vec![Peer::new("2001:db8::7", 10_000)]);
        broadcast(&[Peer::new("::1", port)], None, &envelope).await;

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("frame should arrive")
            .expect("channel open");
        assert_eq!(received.peers.unwrap()[0].ipv6, "2001:db8::7");
    }

    #[tokio::test]
    async fn self_peer_is_skipped() {
        let listener = Listener::bind(&loopback_config()).await.unwrap();
        let port = listener.port().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(listener.run(tx));

        let me = Peer::new("::1", port);
        broadcast(&[me.clone()], Some(&me), &Envelope::default()).await;

        let outcome = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(outcome.is_err(), "no frame should be delivered to self");
    }

    #[tokio::test]
    async fn unreachable_peers_are_swallowed() {
        // Port 9 on loopback is almost certainly closed; broadcast must
        // neither fail nor hang past the dial timeout.
        let envelope = Envelope::default();
        broadcast(
            &[Peer::new("::1", 9), Peer::new("not-an-address", 1)],
            None,
            &envelope,
        )
        .await;
    }

    #[tokio::test]
    async fn garbage_connection_is_dropped() {
        let listener = Listener::bind(&loopback_config()).await.unwrap();
        let port = listener.port().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(listener.run(tx));

        let mut stream = TcpStream::connect(("::1", port)).await.unwrap();
        stream.write_all(b"definitely not zlib").await.unwrap();
        stream.shutdown().await.unwrap();
        drop(stream);

        // A good frame afterwards still gets through.
        broadcast(
            &[Peer::new("::1", port)],
            None,
            &Envelope::peers(vec![Peer::new("2001:db8::1", 1)]),
        )
        .await;

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("frame should arrive")
            .expect("channel open");
        assert!(received.peers.is_some());
    }
}
