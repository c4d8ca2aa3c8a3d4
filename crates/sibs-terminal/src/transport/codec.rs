//! WebSocket message classification.
//!
//! - Text frames are surfaced verbatim (protocol decode happens later, in the
//!   dispatcher, never on the socket task)
//! - Ping/Pong/Close are surfaced for lifecycle management
//! - Binary frames are not part of the terminal protocol

use axum::extract::ws::Message;

#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Ping(Vec<u8>),
    Pong,
    Close,
    Binary { bytes_len: usize },
}

pub fn classify(msg: Message) -> Inbound {
    match msg {
        Message::Text(s) => Inbound::Text(s),
        Message::Binary(b) => Inbound::Binary { bytes_len: b.len() },
        Message::Ping(v) => Inbound::Ping(v),
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_passes_through_untouched() {
        let raw = r#"{"version":"V_1","type":"TX_REQUEST"}"#.to_string();
        assert_eq!(classify(Message::Text(raw.clone())), Inbound::Text(raw));
        assert_eq!(classify(Message::Binary(vec![1, 2, 3])), Inbound::Binary { bytes_len: 3 });
        assert_eq!(classify(Message::Close(None)), Inbound::Close);
    }
}
