//! UDP client for the photo keeper protocol.

use anyhow::{bail, Context};
use keeper_common::{encode_request, RenderSize, Reply, SHUTDOWN_SENTINEL};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// What a reply body says, decoded for bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    File(String),
    Expired,
    Cleared,
    MissingOriginal,
    Failed,
    /// Anything else, e.g. clear-cache error text.
    Other(String),
}

impl ReplyKind {
    pub fn classify(reply: &Reply) -> Self {
        if let Some(path) = reply.file_path() {
            return ReplyKind::File(path.to_string());
        }
        match reply.body.as_str() {
            "expired" => ReplyKind::Expired,
            "ok" => ReplyKind::Cleared,
            "failed" => ReplyKind::Failed,
            body if body.starts_with("missing original image") => ReplyKind::MissingOriginal,
            body => ReplyKind::Other(body.to_string()),
        }
    }

    /// Short label for tables.
    pub fn label(&self) -> &'static str {
        match self {
            ReplyKind::File(_) => "file",
            ReplyKind::Expired => "expired",
            ReplyKind::Cleared => "ok",
            ReplyKind::MissingOriginal => "missing",
            ReplyKind::Failed => "failed",
            ReplyKind::Other(_) => "other",
        }
    }
}

/// One client socket. Requests on it are sequential: each call waits for
/// the reply carrying its serial and discards stragglers from earlier
/// timed-out requests.
pub struct KeeperClient {
    socket: UdpSocket,
    server: SocketAddr,
    timeout: Duration,
    next_serial: u64,
}

impl KeeperClient {
    pub async fn connect(server: SocketAddr, timeout: Duration) -> anyhow::Result<Self> {
        let bind: SocketAddr = if server.is_ipv4() {
            "0.0.0.0:0".parse()?
        } else {
            "[::]:0".parse()?
        };
        let socket = UdpSocket::bind(bind)
            .await
            .context("Failed to bind client socket")?;
        Ok(Self {
            socket,
            server,
            timeout,
            next_serial: 1,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send a request and wait for its reply. Returns the reply and round-trip time.
    pub async fn request(
        &mut self,
        image_id: u64,
        size: RenderSize,
        instructions: &str,
    ) -> anyhow::Result<(Reply, Duration)> {
        let serial = self.next_serial;
        self.next_serial += 1;

        let hint = self.local_addr()?.to_string();
        let payload = encode_request(&hint, serial, image_id, size, instructions);
        let start = Instant::now();
        self.socket.send_to(payload.as_bytes(), self.server).await?;

        let mut buf = [0u8; 2048];
        loop {
            let remaining = self.timeout.saturating_sub(start.elapsed());
            let (len, from) = match timeout(remaining, self.socket.recv_from(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => bail!("No reply to serial {} within {:?}", serial, self.timeout),
            };
            if from != self.server {
                continue;
            }
            let text = String::from_utf8_lossy(&buf[..len]);
            let reply = match Reply::parse(&text) {
                Ok(reply) => reply,
                Err(e) => bail!("Unparseable reply {:?}: {}", text, e),
            };
            if reply.serial == serial {
                return Ok((reply, start.elapsed()));
            }
        }
    }

    pub async fn clear(&mut self, image_id: u64) -> anyhow::Result<(Reply, Duration)> {
        self.request(image_id, RenderSize::ClearCache, "").await
    }

    /// Ask the server to stop. No reply is expected.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.socket
            .send_to(SHUTDOWN_SENTINEL.as_bytes(), self.server)
            .await?;
        Ok(())
    }
}
