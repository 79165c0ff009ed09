//! # Vehicle link
//!
//! The link is the boundary between this crate and the radio/firmware stack. It is modeled as the
//! [VehicleLink] trait so that the flight logic does not depend on a radio being plugged in: the
//! [RadioLink](crate::radio::RadioLink) implementation talks to a real Crazyflie through `crazyflie-lib`.
//!
//! Everything the Crazyflie reports asynchronously (connection state changes, telemetry and log errors) is
//! pushed as [LinkEvent] into the channel given to [VehicleLink::open()]. The receiving side decides when to
//! process them.

use async_trait::async_trait;
use flume::Sender;

use crate::setpoint::Setpoint;
use crate::Result;

/// Maximum number of variables in one log configuration
///
/// A log packet carries at most 30 bytes of data, 5 variables of up to 4 bytes plus the timestamp always fit.
pub const MAX_LOG_CONFIG_VARIABLES: usize = 5;

/// Default sampling period of the log configurations, in milliseconds
pub const DEFAULT_LOG_PERIOD_MS: u64 = 10;

/// Event reported by a [VehicleLink]
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// Connection to the URI established, the Crazyflie is ready to receive commands
    Connected(String),
    /// The connection could not be established. Contains URI and reason.
    ConnectionFailed(String, String),
    /// An established connection has been lost. Contains URI and reason.
    ///
    /// Always followed by [LinkEvent::Disconnected].
    ConnectionLost(String, String),
    /// The link is closed
    Disconnected(String),
    /// A telemetry packet from a started log configuration
    Telemetry(TelemetrySample),
    /// A started log configuration stopped delivering data. Contains the configuration name and the reason.
    LogError(String, String),
}

/// One telemetry packet: the value of every variable of a log configuration at a given time
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    /// Name of the log configuration the sample comes from
    pub config: String,
    /// Crazyflie timestamp, in milliseconds
    pub timestamp: u32,
    /// Variable name and value, in the configuration order
    pub values: Vec<(String, f64)>,
}

/// A named group of telemetry variables sampled at a fixed period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Configuration name
    pub name: String,
    /// Sampling period in milliseconds
    pub period_ms: u64,
    /// Logged variables, formatted as "group.name"
    pub variables: Vec<String>,
}

/// Split a list of variables into log configurations
///
/// Variables are distributed, in order, into configurations named `LogConf0`, `LogConf1`, ... holding at most
/// [MAX_LOG_CONFIG_VARIABLES] variables each.
pub fn group_variables(variables: &[String], period_ms: u64) -> Vec<LogConfig> {
    variables
        .chunks(MAX_LOG_CONFIG_VARIABLES)
        .enumerate()
        .map(|(i, chunk)| LogConfig {
            name: format!("LogConf{}", i),
            period_ms,
            variables: chunk.to_vec(),
        })
        .collect()
}

/// Access to a Crazyflie
///
/// All methods take `&self`, implementations hold their connection state behind interior mutability so that a
/// link can be shared with the tasks it spawns.
#[async_trait]
pub trait VehicleLink: Send + Sync {
    /// Start connecting to `uri`
    ///
    /// Returns immediately. The result of the connection, and every later event, is sent to `events`.
    async fn open(&self, uri: &str, events: Sender<LinkEvent>);

    /// Close the link
    ///
    /// A [LinkEvent::Disconnected] is sent once the link is closed.
    async fn close(&self);

    /// Send an absolute position setpoint
    async fn send_position_setpoint(&self, setpoint: Setpoint) -> Result<()>;

    /// Send a stop setpoint, cutting the motors
    async fn send_stop_setpoint(&self) -> Result<()>;

    /// Lower the priority of the current setpoint so that any other source can take over
    async fn send_notify_setpoint_stop(&self) -> Result<()>;

    /// Set a firmware parameter
    ///
    /// The value is converted to the parameter type by the implementation.
    async fn set_param(&self, name: &str, value: f64) -> Result<()>;

    /// Create and start a log configuration
    ///
    /// Samples are then delivered as [LinkEvent::Telemetry]. An error is returned if the configuration is
    /// rejected, for example because a variable does not exist in the Crazyflie.
    async fn start_log_config(&self, config: &LogConfig) -> Result<()>;
}
