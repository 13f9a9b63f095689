//! UDP wire format.
//!
//! Request datagram: `returnPortHint,requestSerial,imageId,size,instructions`.
//! Fields are trimmed; the instructions field may not contain commas, and
//! any fields past the fifth are ignored. Reply datagram:
//! `requestSerial,response`.

use crate::error::{KeeperError, KeeperResult};
use crate::request::{RenderSize, Response};

/// A datagram starting with this text stops the dispatch loop.
pub const SHUTDOWN_SENTINEL: &str = "KTHXBYE";

/// Largest request datagram accepted. Longer ones are rejected whole.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

const FIELD_COUNT: usize = 5;

/// Fields of a request datagram, before it is stamped with an address and arrival time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub reply_hint: String,
    pub serial: u64,
    pub image_id: u64,
    pub size: RenderSize,
    pub instructions: String,
    /// Number of comma-separated fields after the instructions that were dropped.
    pub extra_fields: usize,
}

/// A decoded inbound datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    Shutdown,
    Request(ParsedRequest),
}

/// Decode raw datagram bytes.
pub fn parse_datagram(bytes: &[u8]) -> KeeperResult<Datagram> {
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(KeeperError::Oversized {
            len: bytes.len(),
            max: MAX_DATAGRAM_SIZE,
        });
    }
    if bytes.starts_with(SHUTDOWN_SENTINEL.as_bytes()) {
        return Ok(Datagram::Shutdown);
    }

    let text = std::str::from_utf8(bytes).map_err(|_| KeeperError::InvalidEncoding)?;
    parse_request(text).map(Datagram::Request)
}

/// Parse the comma-separated request text.
pub fn parse_request(text: &str) -> KeeperResult<ParsedRequest> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() < FIELD_COUNT {
        return Err(KeeperError::MissingFields {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let serial = fields[1]
        .parse::<u64>()
        .map_err(|e| KeeperError::invalid("requestSerial", format!("'{}': {}", fields[1], e)))?;

    let image_id = fields[2]
        .parse::<u64>()
        .map_err(|e| KeeperError::invalid("imageId", format!("'{}': {}", fields[2], e)))?;
    if image_id == 0 {
        return Err(KeeperError::invalid("imageId", "must be positive"));
    }

    let raw_size = fields[3]
        .parse::<i64>()
        .map_err(|e| KeeperError::invalid("size", format!("'{}': {}", fields[3], e)))?;
    let size = RenderSize::from_wire(raw_size)
        .ok_or_else(|| KeeperError::invalid("size", format!("{} is out of range", raw_size)))?;

    Ok(ParsedRequest {
        reply_hint: fields[0].to_string(),
        serial,
        image_id,
        size,
        instructions: fields[4].to_string(),
        extra_fields: fields.len() - FIELD_COUNT,
    })
}

/// Build a request datagram payload.
pub fn encode_request(
    reply_hint: &str,
    serial: u64,
    image_id: u64,
    size: RenderSize,
    instructions: &str,
) -> String {
    format!("{},{},{},{},{}", reply_hint, serial, image_id, size, instructions)
}

/// Build a reply datagram payload.
pub fn encode_reply(serial: u64, response: &Response) -> String {
    format!("{},{}", serial, response)
}

/// A reply as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub serial: u64,
    pub body: String,
}

impl Reply {
    pub fn parse(text: &str) -> KeeperResult<Self> {
        let (serial, body) = text.split_once(',').ok_or(KeeperError::MissingFields {
            expected: 2,
            found: 1,
        })?;
        let serial = serial
            .trim()
            .parse::<u64>()
            .map_err(|e| KeeperError::invalid("requestSerial", e.to_string()))?;

        Ok(Self {
            serial,
            body: body.to_string(),
        })
    }

    /// Path of the served file, for `file://` replies.
    pub fn file_path(&self) -> Option<&str> {
        self.body.strip_prefix("file://")
    }
}
