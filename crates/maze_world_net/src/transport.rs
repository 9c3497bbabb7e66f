//! Blocking byte-frame channels and the request/reply client.
//!
//! The transport contract is deliberately small: reliable, ordered,
//! blocking delivery of whole frames. `RequestClient` layers the
//! request/reply discipline on top — one send, then exactly one receive —
//! and faults on any other ordering, since a desynchronized channel has no
//! way to re-pair requests with replies.

use std::sync::mpsc::{channel, Receiver, Sender};

use maze_world_proto::{decode_reply, encode_message, MazeError, Message, Reply};

pub trait BlockingChannel {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), MazeError>;
    /// Blocks until a frame arrives or the peer closes the channel.
    fn recv(&mut self) -> Result<Vec<u8>, MazeError>;
}

/// One endpoint of an in-process duplex channel.
pub struct InMemoryChannel {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

/// Builds a connected pair of endpoints. Frames sent on one endpoint
/// arrive on the other, in order.
pub fn channel_pair() -> (InMemoryChannel, InMemoryChannel) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();
    (
        InMemoryChannel { tx: a_tx, rx: a_rx },
        InMemoryChannel { tx: b_tx, rx: b_rx },
    )
}

impl BlockingChannel for InMemoryChannel {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), MazeError> {
        self.tx.send(frame).map_err(|_| MazeError::ChannelClosed)
    }

    fn recv(&mut self) -> Result<Vec<u8>, MazeError> {
        self.rx.recv().map_err(|_| MazeError::ChannelClosed)
    }
}

/// A pure requester: owns a channel and alternates strictly between one
/// send and one receive.
pub struct RequestClient<C: BlockingChannel> {
    channel: C,
    awaiting_reply: bool,
}

impl<C: BlockingChannel> RequestClient<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            awaiting_reply: false,
        }
    }

    /// Sends a request. Faults if the previous reply was not consumed.
    pub fn send(&mut self, message: &Message) -> Result<(), MazeError> {
        if self.awaiting_reply {
            return Err(MazeError::RequestDiscipline {
                detail: "send with a reply still pending".to_string(),
            });
        }
        let frame = encode_message(message)?;
        self.channel.send(frame)?;
        self.awaiting_reply = true;
        Ok(())
    }

    /// Blocks for the pending reply. Faults if no request is outstanding.
    /// An error reply from the peer surfaces as `Err`.
    pub fn receive(&mut self) -> Result<Reply, MazeError> {
        if !self.awaiting_reply {
            return Err(MazeError::RequestDiscipline {
                detail: "receive without a pending request".to_string(),
            });
        }
        let frame = self.channel.recv()?;
        self.awaiting_reply = false;
        match decode_reply(&frame)? {
            Reply::Error(error) => Err(error.into()),
            reply => Ok(reply),
        }
    }

    /// One synchronous round trip.
    pub fn request(&mut self, message: &Message) -> Result<Reply, MazeError> {
        self.send(message)?;
        self.receive()
    }
}
