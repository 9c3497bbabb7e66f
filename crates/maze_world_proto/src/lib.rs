//! Wire protocol shared by the in-simulation adapter and the remote
//! controller: grid primitives, message/reply taxonomy, the canonical
//! learned-policy serialization, and the CBOR codec.

pub mod error;
pub mod grid;
pub mod messages;
pub mod policy;
pub mod wire;

pub use error::{ErrorCode, ErrorReply, MazeError};
pub use grid::{
    AgentId, Direction, Pos, GHOST_DIRECTIONS, PACMAN_DIRECTIONS, PACMAN_ID,
};
pub use messages::{AgentKind, AgentTeam, Message, Reply, StatePayload};
pub use policy::PolicyTable;
pub use wire::{
    decode_message, decode_reply, encode_message, encode_reply, to_canonical_cbor,
};
