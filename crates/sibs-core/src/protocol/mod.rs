//! Terminal wire protocol (JSON text frames).
//!
//! - `envelope`: first decode phase, `version` + `type` only.
//! - `types`: the type registry (tag <-> kind, request -> response).
//! - `messages`: payload shapes and the `Message` tagged union.
//! - `codec`: two-phase decode, tag-stamping encode.
//!
//! Nothing here panics on hostile input: malformed frames come back as
//! `SibsError::Decode` and unknown tags as `Decoded::Unrecognized`.

pub mod codec;
pub mod envelope;
pub mod messages;
pub mod types;

pub use codec::{decode, decode_as, encode, Decoded};
pub use envelope::{decode_envelope, Header, PROTOCOL_VERSION};
pub use messages::Message;
pub use types::{Direction, MessageType};
