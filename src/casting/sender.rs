use crate::casting::protocol;
use crate::configuration::ReceiverConfig;
use crate::error_handling::types::ReceiverError;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// A playback device known to the sender.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Receiver {
    pub name: String,
    pub id: String,
}

/// Where one session wants its stream played.
#[derive(Debug, Clone)]
pub struct ReceiverTarget {
    pub name: String,
    pub host: Option<String>,
    pub port: u16,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Direct-address FCast sender.
#[derive(Debug, Clone, Default)]
pub struct FcastSender;

impl FcastSender {
    async fn send(&self, host: &str, port: u16, packet: &[u8]) -> Result<(), ReceiverError> {
        let mut stream =
            tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
                .await
                .map_err(|_| {
                    ReceiverError::Connection(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("connect to {}:{} timed out", host, port),
                    ))
                })??;
        stream.write_all(packet).await?;
        stream.shutdown().await?;
        Ok(())
    }

    fn resolve<'t>(&self, target: &'t ReceiverTarget) -> Result<&'t str, ReceiverError> {
        // Name-only targets need discovery, which the direct sender does not
        // support; the caller treats this as a degraded link.
        target
            .host
            .as_deref()
            .ok_or_else(|| ReceiverError::NoAddress(target.name.clone()))
    }

    pub async fn play(
        &self,
        target: &ReceiverTarget,
        media_url: &str,
        title: &str,
    ) -> Result<(), ReceiverError> {
        let host = self.resolve(target)?;
        info!(
            "Casting '{}' to receiver {} at {}:{}",
            title, target.name, host, target.port
        );
        let packet = protocol::encode_play(&protocol::PlayMessage::hls(media_url));
        self.send(host, target.port, &packet).await
    }

    pub async fn stop(&self, target: &ReceiverTarget) -> Result<(), ReceiverError> {
        let host = self.resolve(target)?;
        debug!(
            "Stopping playback on receiver {} at {}:{}",
            target.name, host, target.port
        );
        self.send(host, target.port, &protocol::encode_stop()).await
    }
}

/// The receiver-control capability, fixed at process start.
///
/// [`Sender::Disabled`] keeps every call a cheap no-op so session logic never
/// has to branch on availability.
#[derive(Debug, Clone)]
pub enum Sender {
    Fcast(FcastSender),
    Disabled,
}

impl Sender {
    pub fn from_config(config: &ReceiverConfig) -> Self {
        if config.enabled {
            Sender::Fcast(FcastSender)
        } else {
            warn!("Receiver control disabled by configuration; sessions will not cast");
            Sender::Disabled
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Sender::Fcast(_))
    }

    /// Lists known receivers. The direct-address sender has no discovery
    /// support, so this is empty in both variants; an empty list is the
    /// degraded answer, never an error.
    pub async fn discover(&self) -> Vec<Receiver> {
        Vec::new()
    }

    pub async fn play(
        &self,
        target: &ReceiverTarget,
        media_url: &str,
        title: &str,
    ) -> Result<(), ReceiverError> {
        match self {
            Sender::Fcast(sender) => sender.play(target, media_url, title).await,
            Sender::Disabled => Err(ReceiverError::Unavailable),
        }
    }

    pub async fn stop(&self, target: &ReceiverTarget) -> Result<(), ReceiverError> {
        match self {
            Sender::Fcast(sender) => sender.stop(target).await,
            Sender::Disabled => Err(ReceiverError::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn target(host: Option<&str>, port: u16) -> ReceiverTarget {
        ReceiverTarget {
            name: String::from("living-room"),
            host: host.map(String::from),
            port,
        }
    }

    #[tokio::test]
    async fn disabled_sender_degrades_every_call() {
        let sender = Sender::from_config(&ReceiverConfig {
            enabled: false,
            default_port: 46899,
        });
        assert!(!sender.is_available());
        assert!(sender.discover().await.is_empty());
        assert!(matches!(
            sender.play(&target(Some("127.0.0.1"), 1), "http://x/index.m3u8", "t").await,
            Err(ReceiverError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn name_only_target_reports_missing_address() {
        let sender = Sender::Fcast(FcastSender);
        assert!(matches!(
            sender.play(&target(None, 46899), "http://x/index.m3u8", "t").await,
            Err(ReceiverError::NoAddress(_))
        ));
    }

    #[tokio::test]
    async fn play_sends_a_framed_packet_over_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let sender = Sender::Fcast(FcastSender);
        sender
            .play(
                &target(Some("127.0.0.1"), addr.port()),
                "http://10.0.0.5:8080/cast/ab/index.m3u8",
                "WebCast",
            )
            .await
            .unwrap();

        let received = server.await.unwrap();
        let length = u32::from_le_bytes(received[0..4].try_into().unwrap()) as usize;
        assert_eq!(length, received.len() - 4);
        assert_eq!(received[4], protocol::OPCODE_PLAY);
        let body: serde_json::Value = serde_json::from_slice(&received[5..]).unwrap();
        assert_eq!(body["container"], protocol::HLS_CONTAINER);
    }

    #[tokio::test]
    async fn unreachable_receiver_is_a_connection_error() {
        let sender = Sender::Fcast(FcastSender);
        // Port 1 on localhost is essentially never listening.
        let result = sender.stop(&target(Some("127.0.0.1"), 1)).await;
        assert!(matches!(result, Err(ReceiverError::Connection(_))));
    }
}
