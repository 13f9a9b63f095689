//! The request value object carried from ingestion to a worker and back.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::protocol::{encode_reply, ParsedRequest};

/// What a request asks for, decoded from the wire `size` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderSize {
    /// `-1`: delete every cached render of the image.
    ClearCache,
    /// `0`: serve the original file untouched.
    Original,
    /// `>0`: longer edge of the rendered image, in pixels.
    Edge(u32),
}

impl RenderSize {
    /// Decode the wire value. Anything below `-1` is rejected.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            -1 => Some(RenderSize::ClearCache),
            0 => Some(RenderSize::Original),
            n if n > 0 => u32::try_from(n).ok().map(RenderSize::Edge),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> i64 {
        match self {
            RenderSize::ClearCache => -1,
            RenderSize::Original => 0,
            RenderSize::Edge(edge) => i64::from(*edge),
        }
    }
}

impl fmt::Display for RenderSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// Outcome of handling a request, as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A ready-to-serve file (cache entry or untouched original).
    File(PathBuf),
    /// The request sat in the queue past the expiry threshold.
    Expired,
    /// Clear-cache finished without errors.
    Cleared,
    /// Clear-cache hit filesystem errors; carries their descriptions.
    ClearFailed(String),
    /// No original exists for the image id.
    MissingOriginal(PathBuf),
    /// The render transform failed.
    RenderFailed,
}

impl Response {
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Response::File(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::File(path) => write!(f, "file://{}", path.display()),
            Response::Expired => f.write_str("expired"),
            Response::Cleared => f.write_str("ok"),
            Response::ClearFailed(message) => f.write_str(message),
            Response::MissingOriginal(path) => {
                write!(f, "missing original image: {}", path.display())
            }
            Response::RenderFailed => f.write_str("failed"),
        }
    }
}

/// A parsed client request waiting for a worker.
///
/// Ownership moves through the request queue to exactly one worker, which
/// consumes it with [`Request::answer`]. The resulting [`Answer`] is what
/// travels back to the dispatch loop, so a request can be answered once only.
#[derive(Debug)]
pub struct Request {
    /// Where the reply goes (the datagram's source address).
    pub return_addr: SocketAddr,
    /// Reply-channel hint supplied by the client. Informational only.
    pub reply_hint: String,
    pub serial: u64,
    pub image_id: u64,
    pub size: RenderSize,
    pub instructions: String,
    pub arrived_at: Instant,
}

impl Request {
    pub fn new(return_addr: SocketAddr, parsed: ParsedRequest) -> Self {
        Self {
            return_addr,
            reply_hint: parsed.reply_hint,
            serial: parsed.serial,
            image_id: parsed.image_id,
            size: parsed.size,
            instructions: parsed.instructions,
            arrived_at: Instant::now(),
        }
    }

    /// Time spent since the datagram arrived.
    pub fn age(&self) -> Duration {
        self.arrived_at.elapsed()
    }

    pub fn answer(self, response: Response) -> Answer {
        Answer {
            request: self,
            response,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {}/{}",
            self.return_addr, self.serial, self.image_id, self.size
        )
    }
}

/// A request together with its final response, queued for one reply send.
#[derive(Debug)]
pub struct Answer {
    pub request: Request,
    pub response: Response,
}

impl Answer {
    /// The reply datagram payload, `"<serial>,<response>"`.
    pub fn reply_text(&self) -> String {
        encode_reply(self.request.serial, &self.response)
    }

    /// Time from datagram arrival until now.
    pub fn latency(&self) -> Duration {
        self.request.age()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> Request {
        let parsed = ParsedRequest {
            reply_hint: "127.0.0.1:9999".to_string(),
            serial: 17,
            image_id: 42,
            size: RenderSize::Edge(350),
            instructions: String::new(),
            extra_fields: 0,
        };
        Request::new("127.0.0.1:9999".parse().unwrap(), parsed)
    }

    #[test]
    fn test_render_size_from_wire() {
        assert_eq!(RenderSize::from_wire(-1), Some(RenderSize::ClearCache));
        assert_eq!(RenderSize::from_wire(0), Some(RenderSize::Original));
        assert_eq!(RenderSize::from_wire(350), Some(RenderSize::Edge(350)));
        assert_eq!(RenderSize::from_wire(-2), None);
        assert_eq!(RenderSize::from_wire(i64::MAX), None);
    }

    #[test]
    fn test_response_wire_text() {
        assert_eq!(
            Response::File(PathBuf::from("/cache/42/42.350.abcdef.jpg")).to_string(),
            "file:///cache/42/42.350.abcdef.jpg"
        );
        assert_eq!(Response::Expired.to_string(), "expired");
        assert_eq!(Response::Cleared.to_string(), "ok");
        assert_eq!(Response::RenderFailed.to_string(), "failed");
        assert_eq!(
            Response::MissingOriginal(PathBuf::from("/orig/2/4/42.jpg")).to_string(),
            "missing original image: /orig/2/4/42.jpg"
        );
    }

    #[test]
    fn test_answer_reply_text() {
        let answer = sample_request().answer(Response::Expired);
        assert_eq!(answer.reply_text(), "17,expired");
    }

    #[test]
    fn test_request_display() {
        assert_eq!(sample_request().to_string(), "127.0.0.1:9999:17 42/350");
    }
}
