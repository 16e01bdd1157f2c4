//! RCON over TCP.
//!
//! Every packet on the wire is a little-endian `i32` length (not counting the
//! length field itself), an `i32` request ID, an `i32` packet type, the body,
//! and two NUL bytes.

mod client;
mod packet;

pub use client::{RconClient, RconConnector};
pub use packet::{
    Packet, MAX_COMMAND_LEN, MAX_PACKET_LEN, PACKET_TYPE_AUTH_RESPONSE, PACKET_TYPE_EXEC_COMMAND,
    PACKET_TYPE_LOGIN, PACKET_TYPE_RESPONSE_VALUE,
};
