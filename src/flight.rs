//! # Tuning flight
//!
//! Scripted flight used to record the behavior of a controller: take off, hover in place for a fixed time,
//! land, and write the recorded state estimate to a JSON file.

use std::path::PathBuf;
use std::time::Duration;

use log::{error, info};
use tokio::time::{sleep, Instant};

use crate::client::{VehicleClient, SETPOINT_PERIOD};
use crate::link::VehicleLink;
use crate::setpoint::Position;
use crate::Result;

/// Default Crazyflie address
pub const DEFAULT_URI: &str = "radio://0/11/2M/E7E7E7E701";

/// Default hover height, in meters
pub const HEIGHT: f32 = 0.5;

/// Height at which the takeoff starts its slow climb and the landing ends, in meters
const GROUND_CLEARANCE: f32 = 0.1;

const CONNECT_POLL: Duration = Duration::from_secs(1);
const STARTUP_IDLE: Duration = Duration::from_secs(1);
const SETTLE: Duration = Duration::from_millis(100);

/// State estimate variables logged during the tuning flight
pub const TUNING_VARIABLES: [&str; 12] = [
    // position, in mm
    "stateEstimateZ.x",
    "stateEstimateZ.y",
    "stateEstimateZ.z",
    // velocity, in mm/s
    "stateEstimateZ.vx",
    "stateEstimateZ.vy",
    "stateEstimateZ.vz",
    // orientation, in degrees (legacy CF2 body frame: pitch is inverted)
    "stateEstimate.roll",
    "stateEstimate.pitch",
    "stateEstimate.yaw",
    // angular velocity, in milliradians/s
    "stateEstimateZ.rateRoll",
    "stateEstimateZ.ratePitch",
    "stateEstimateZ.rateYaw",
];

/// Parameters of a tuning flight
#[derive(Debug, Clone, PartialEq)]
pub struct FlightPlan {
    /// Crazyflie URI
    pub uri: String,
    /// Hover height, in meters
    pub height: f32,
    /// Hover position, in meters
    pub hover: Position,
    /// Hover yaw, in degrees
    pub hover_yaw: f32,
    /// Time spent hovering
    pub hover_duration: Duration,
    /// Controller used for the flight, see [Controller](crate::controller::Controller)
    pub controller: String,
    /// Logged variables
    pub variables: Vec<String>,
    /// Base name of the output file
    pub output: String,
    /// Directory the output file is written to
    pub output_dir: PathBuf,
}

impl Default for FlightPlan {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_owned(),
            height: HEIGHT,
            hover: Position::new(0.0, 0.0, HEIGHT),
            hover_yaw: 0.0,
            hover_duration: Duration::from_secs(10),
            controller: "mellinger".to_owned(),
            variables: TUNING_VARIABLES.iter().map(|v| v.to_string()).collect(),
            output: "tuning_data.json".to_owned(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl FlightPlan {
    /// Default plan flying the Crazyflie at `uri`
    pub fn with_uri(uri: &str) -> Self {
        Self {
            uri: uri.to_owned(),
            ..Default::default()
        }
    }

    /// Connect to the Crazyflie of this plan and fly it
    pub async fn run<L: VehicleLink>(&self, link: L) -> Result<PathBuf> {
        let mut client = VehicleClient::connect(link, &self.uri, &self.variables).await;
        fly(&mut client, self).await
    }
}

/// Fly a tuning flight with an already created client
///
/// Returns the path of the telemetry file. The telemetry is written even if the flight is aborted by an error,
/// the error is then returned once the file is written.
pub async fn fly<L: VehicleLink>(client: &mut VehicleClient<L>, plan: &FlightPlan) -> Result<PathBuf> {
    client.wait_connected(CONNECT_POLL).await;

    let flown = maneuver(client, plan).await;
    client.disconnect().await;
    let path = client.persist_in(&plan.output_dir, &plan.output).await?;

    match flown {
        Ok(()) => Ok(path),
        Err(e) => {
            error!("Flight aborted: {}", e);
            Err(e)
        }
    }
}

async fn maneuver<L: VehicleLink>(client: &mut VehicleClient<L>, plan: &FlightPlan) -> Result<()> {
    // Leave time at the start to initialize
    client.stop(STARTUP_IDLE).await?;

    client.reset_estimator().await?;
    client.switch_controller(&plan.controller).await?;
    sleep(SETTLE).await;

    info!("takeoff...");
    let ground = Position::new(0.0, 0.0, 0.0);
    let clearance = Position::new(0.0, 0.0, GROUND_CLEARANCE);
    client
        .move_smooth(ground, clearance, 0.0, Duration::from_millis(500))
        .await?;
    client
        .move_smooth(clearance, plan.hover, plan.hover_yaw, Duration::from_secs(2))
        .await?;
    sleep(SETTLE).await;

    info!("hover...");
    let start = Instant::now();
    while start.elapsed() < plan.hover_duration {
        let Position { x, y, z } = plan.hover;
        client.move_to(x, y, z, plan.hover_yaw, SETPOINT_PERIOD).await?;
    }

    info!("landing...");
    client
        .move_smooth(
            Position::new(0.0, 0.0, plan.height),
            clearance,
            0.0,
            Duration::from_secs(1),
        )
        .await?;
    client
        .move_to(0.0, 0.0, GROUND_CLEARANCE, 0.0, Duration::from_millis(500))
        .await?;
    client.land(Duration::ZERO).await
}
