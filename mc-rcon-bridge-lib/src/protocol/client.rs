use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::packet::*;
use crate::config::RconConfig;
use crate::error::RconError;
use crate::transport::{Connector, Session};

/// An authenticated RCON connection to a single server
#[derive(Debug)]
pub struct RconClient {
    stream: TcpStream,
    /// The last request ID handed out
    last_id: i32,
}

impl RconClient {
    /// Connects to `address` and authenticates with `password`
    pub async fn connect(address: &str, password: &str) -> Result<Self, RconError> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;

        let mut client = Self { stream, last_id: 0 };
        client.authenticate(password).await?;
        debug!("Authenticated RCON session to {}", address);

        Ok(client)
    }

    /// Returns a fresh positive request ID
    ///
    /// `-1` is reserved by the server to signal an authentication failure.
    fn next_id(&mut self) -> i32 {
        self.last_id = if self.last_id == i32::MAX {
            1
        } else {
            self.last_id + 1
        };
        self.last_id
    }

    async fn authenticate(&mut self, password: &str) -> Result<(), RconError> {
        let id = self.next_id();
        Packet::new(id, PACKET_TYPE_LOGIN, password)
            .write_to(&mut self.stream)
            .await?;

        loop {
            let packet = Packet::read_from(&mut self.stream).await?;
            match packet.kind {
                PACKET_TYPE_AUTH_RESPONSE if packet.id == -1 => return Err(RconError::AuthRejected),
                PACKET_TYPE_AUTH_RESPONSE if packet.id == id => return Ok(()),
                // Some servers send an empty response value ahead of the
                // auth response
                PACKET_TYPE_RESPONSE_VALUE => continue,
                _ => {
                    return Err(RconError::Malformed(format!(
                        "unexpected packet (id {}, type {}) during authentication",
                        packet.id, packet.kind
                    )))
                }
            }
        }
    }

    /// Runs `command` on the server and returns its response
    ///
    /// Responses that the server splits over several packets are joined back
    /// together. This relies on the server answering an empty response-value
    /// packet after the command, which Minecraft servers do.
    pub async fn cmd(&mut self, command: &str) -> Result<String, RconError> {
        if command.len() > MAX_COMMAND_LEN {
            return Err(RconError::CommandTooLong {
                len: command.len(),
                max: MAX_COMMAND_LEN,
            });
        }

        let id = self.next_id();
        let terminator_id = self.next_id();

        let mut buf = Packet::new(id, PACKET_TYPE_EXEC_COMMAND, command).encode();
        buf.extend(Packet::new(terminator_id, PACKET_TYPE_RESPONSE_VALUE, "").encode());
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;

        let mut response = String::new();
        loop {
            let packet = Packet::read_from(&mut self.stream).await?;
            if packet.id == terminator_id {
                break;
            } else if packet.id == id {
                response.push_str(&packet.body);
            } else if packet.id == -1 {
                return Err(RconError::AuthRejected);
            }
            // Anything else is a late answer to an earlier request
        }

        Ok(response)
    }

    /// Shuts down the connection
    pub async fn close(&mut self) -> Result<(), RconError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl Session for RconClient {
    async fn send(&mut self, command: &str) -> Result<String, RconError> {
        self.cmd(command).await
    }

    async fn close(&mut self) -> Result<(), RconError> {
        RconClient::close(self).await
    }
}

/// Opens `RconClient`s to the server described by an `RconConfig`
#[derive(Debug, Clone)]
pub struct RconConnector {
    address: String,
    password: String,
}

impl RconConnector {
    pub fn new<A: Into<String>, P: Into<String>>(address: A, password: P) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &RconConfig) -> Self {
        Self::new(config.address(), config.password.clone())
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Connector for RconConnector {
    type Session = RconClient;

    async fn connect(&self) -> Result<RconClient, RconError> {
        RconClient::connect(&self.address, &self.password).await
    }
}
