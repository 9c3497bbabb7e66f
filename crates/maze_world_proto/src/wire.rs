//! CBOR wire codec.
//!
//! Encoding goes through `serde_cbor::Value` so map keys serialize in
//! canonical order, then appends the self-describing tag. Both peers must
//! produce byte-identical frames for equal values.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::MazeError;
use crate::messages::{Message, Reply};

pub fn to_canonical_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, MazeError> {
    let mut buf = Vec::with_capacity(256);
    let canonical_value = serde_cbor::value::to_value(value)?;
    let mut serializer = serde_cbor::ser::Serializer::new(&mut buf);
    serializer.self_describe()?;
    canonical_value.serialize(&mut serializer)?;
    Ok(buf)
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, MazeError> {
    Ok(serde_cbor::from_slice(bytes)?)
}

pub fn encode_message(message: &Message) -> Result<Vec<u8>, MazeError> {
    to_canonical_cbor(message)
}

pub fn decode_message(bytes: &[u8]) -> Result<Message, MazeError> {
    from_cbor(bytes)
}

pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>, MazeError> {
    to_canonical_cbor(reply)
}

pub fn decode_reply(bytes: &[u8]) -> Result<Reply, MazeError> {
    from_cbor(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;

    #[test]
    fn message_codec_round_trips() {
        let message = Message::RequestInitialization { agent_id: 1 };
        let frame = encode_message(&message).expect("encode");
        let decoded = decode_message(&frame).expect("decode");
        assert_eq!(decoded, message);
    }

    #[test]
    fn reply_codec_round_trips() {
        let reply = Reply::Action {
            direction: Direction::West,
        };
        let frame = encode_reply(&reply).expect("encode");
        let decoded = decode_reply(&frame).expect("decode");
        assert_eq!(decoded, reply);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_message(&[0xff, 0x00, 0x13]).is_err());
    }

    #[test]
    fn equal_values_encode_identically() {
        let message = Message::RequestPolicy { agent_id: 4 };
        let a = encode_message(&message).expect("encode a");
        let b = encode_message(&message.clone()).expect("encode b");
        assert_eq!(a, b);
    }
}
