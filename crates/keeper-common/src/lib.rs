//! Common types shared by the photo keeper daemon and its client tools.

pub mod error;
pub mod protocol;
pub mod request;

pub use error::{KeeperError, KeeperResult};
pub use protocol::{
    encode_reply, encode_request, parse_datagram, parse_request, Datagram, ParsedRequest, Reply,
    MAX_DATAGRAM_SIZE, SHUTDOWN_SENTINEL,
};
pub use request::{Answer, RenderSize, Request, Response};
