//! The UDP dispatch loop.
//!
//! Owns the socket. Incoming datagrams become queued requests; answers
//! from the workers become reply datagrams. Both directions run on the one
//! task, so the socket is never shared.

use keeper_common::{parse_datagram, Answer, Datagram, Request, MAX_DATAGRAM_SIZE};
use metrics::gauge;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::WorkQueue;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct Dispatcher {
    socket: UdpSocket,
    queue: WorkQueue<Request>,
    answers: mpsc::UnboundedReceiver<Answer>,
    stats: Arc<Stats>,
}

impl Dispatcher {
    /// Bind the request socket.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        queue: WorkQueue<Request>,
        answers: mpsc::UnboundedReceiver<Answer>,
        stats: Arc<Stats>,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket,
            queue,
            answers,
            stats,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Run until the shutdown sentinel arrives or `shutdown` resolves.
    ///
    /// Requests still queued or in flight at that point are abandoned.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        let Dispatcher {
            socket,
            queue,
            mut answers,
            stats,
        } = self;

        // One spare byte so oversized datagrams are detected, not truncated.
        let mut buf = [0u8; MAX_DATAGRAM_SIZE + 1];
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Interrupted, leaving dispatch loop");
                    break;
                }
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, from)) => {
                            if ingest(&queue, &buf[..len], from) == Flow::Stop {
                                break;
                            }
                        }
                        // ICMP errors from earlier sends surface here on some platforms.
                        Err(e) => warn!(error = %e, "UDP receive failed"),
                    }
                }
                Some(answer) = answers.recv() => {
                    send_reply(&socket, &stats, answer).await;
                }
            }
        }

        let abandoned = queue.len();
        if abandoned > 0 {
            warn!(abandoned, "Shutting down with requests still queued");
        }
        Ok(())
    }
}

fn ingest(queue: &WorkQueue<Request>, bytes: &[u8], from: SocketAddr) -> Flow {
    match parse_datagram(bytes) {
        Ok(Datagram::Shutdown) => {
            info!(from = %from, "Shutdown requested");
            Flow::Stop
        }
        Ok(Datagram::Request(parsed)) => {
            if parsed.extra_fields > 0 {
                debug!(from = %from, extra = parsed.extra_fields, "Ignoring trailing fields");
            }
            let request = Request::new(from, parsed);
            let summary = request.to_string();
            let depth = queue.push(request);
            gauge!("keeper_queue_depth").set(depth as f64);
            info!(request = %summary, depth, "Queued request");
            Flow::Continue
        }
        Err(e) => {
            let shown = &bytes[..bytes.len().min(MAX_DATAGRAM_SIZE)];
            error!(
                from = %from,
                payload = %String::from_utf8_lossy(shown).escape_debug(),
                error = %e,
                "Ignoring bogus request"
            );
            Flow::Continue
        }
    }
}

async fn send_reply(socket: &UdpSocket, stats: &Stats, answer: Answer) {
    let text = answer.reply_text();
    let to = answer.request.return_addr;

    match socket.send_to(text.as_bytes(), to).await {
        Ok(_) => {
            let latency = answer.latency();
            stats.record_reply(latency);
            info!(
                request = %answer.request,
                response = %answer.response,
                latency_ms = latency.as_millis() as u64,
                "Served request"
            );
        }
        Err(e) => {
            warn!(to = %to, serial = answer.request.serial, error = %e, "Failed to send reply");
        }
    }
}
