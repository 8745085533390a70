//! Telemetry sinks for the steering value.
//!
//! The robot side listens for one small JSON datagram per published cycle, keyed the
//! way the drive code reads its table entries.

use log::info;
use note_vision::{TelemetryPublisher, VisionError};
use serde::{Deserialize, Serialize};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

pub const TELEMETRY_TABLE: &str = "PIDRotations";
pub const TELEMETRY_KEY: &str = "PIDRotation";

/// Wire form of one steering update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteeringUpdate {
    pub table: String,
    pub key: String,
    pub value: f64,
}

impl SteeringUpdate {
    pub fn new(value: f64) -> Self {
        Self {
            table: TELEMETRY_TABLE.to_string(),
            key: TELEMETRY_KEY.to_string(),
            value,
        }
    }
}

/// Sends each steering value as a JSON datagram. Delivery is fire-and-forget.
pub struct UdpPublisher {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpPublisher {
    pub fn connect(target: impl ToSocketAddrs) -> io::Result<Self> {
        let target = target.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "telemetry address resolved to nothing")
        })?;
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        info!("publishing steering to {target}");
        Ok(Self { socket, target })
    }
}

impl TelemetryPublisher for UdpPublisher {
    fn publish(&mut self, steering: f64) -> Result<(), VisionError> {
        let payload =
            serde_json::to_vec(&SteeringUpdate::new(steering)).map_err(io::Error::from)?;
        self.socket.send_to(&payload, self.target)?;
        Ok(())
    }
}

/// Writes each steering value to the log. Used when no telemetry address is given.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl TelemetryPublisher for LogPublisher {
    fn publish(&mut self, steering: f64) -> Result<(), VisionError> {
        info!("{TELEMETRY_TABLE}/{TELEMETRY_KEY} = {steering:.4}");
        Ok(())
    }
}
