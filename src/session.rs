//! # Connection session
//!
//! A [Session] tracks one connection attempt to one URI. Its state only changes as a reaction to
//! [LinkEvent](crate::link::LinkEvent)s reported by the link:
//!
//! ```text
//! Disconnected --connect()--> Connecting --Connected--> Connected
//!      ^                          |                         |
//!      +-----ConnectionFailed-----+                         |
//!      +---------------------Disconnected------------------+
//! ```

use log::{info, warn};
use tokio::time::Instant;

use crate::link::LinkEvent;

/// State of the connection to the Crazyflie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link open
    Disconnected,
    /// Link opened, waiting for the Crazyflie
    Connecting,
    /// Crazyflie connected and ready
    Connected,
}

/// One connection to a Crazyflie
#[derive(Debug)]
pub struct Session {
    uri: String,
    state: ConnectionState,
    started: Instant,
}

impl Session {
    /// Create a disconnected session for `uri`
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_owned(),
            state: ConnectionState::Disconnected,
            started: Instant::now(),
        }
    }

    /// URI of the Crazyflie
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True when the Crazyflie is connected
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Time at which the session was created
    pub fn started(&self) -> Instant {
        self.started
    }

    pub(crate) fn connecting(&mut self) {
        info!("Connecting to {}", self.uri);
        self.state = ConnectionState::Connecting;
    }

    /// Update the state from a link event
    ///
    /// Returns true if the event just established the connection. Telemetry events are not connection events
    /// and leave the session untouched.
    pub fn handle(&mut self, event: &LinkEvent) -> bool {
        match event {
            LinkEvent::Connected(uri) => {
                info!("Connected to {}", uri);
                let established = self.state != ConnectionState::Connected;
                self.state = ConnectionState::Connected;
                established
            }
            LinkEvent::ConnectionFailed(uri, reason) => {
                warn!(
                    "Connection to {} failed: {}. Press Ctrl+C to kill the program and restart.",
                    uri, reason
                );
                self.state = ConnectionState::Disconnected;
                false
            }
            LinkEvent::ConnectionLost(uri, reason) => {
                warn!("Connection to {} lost: {}", uri, reason);
                false
            }
            LinkEvent::Disconnected(uri) => {
                info!("Disconnected from {}", uri);
                self.state = ConnectionState::Disconnected;
                false
            }
            LinkEvent::Telemetry(_) | LinkEvent::LogError(_, _) => false,
        }
    }
}
