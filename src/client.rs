//! # Vehicle client
//!
//! The [VehicleClient] owns the connection [Session], the [TelemetryBuffer] and the setpoint primitives used by
//! flight scripts.
//!
//! The Crazyflie drops a low-level setpoint that is not refreshed in time, so every motion primitive here is a
//! loop re-sending the setpoint every [SETPOINT_PERIOD]. Link events are processed between two setpoints: the
//! client is the only owner of the session and of the buffer, nothing is shared with the link tasks.
//!
//! Once the link is lost, commands are dropped with a debug log instead of failing: a flight script keeps its
//! timing and still reaches the point where it saves the telemetry.
//!
//! ``` no_run
//! # use std::time::Duration;
//! # use crazyflie_hover::{client::VehicleClient, radio::RadioLink, setpoint::Position};
//! # async fn fly() -> crazyflie_hover::Result<()> {
//! let variables = vec!["stateEstimate.z".to_string()];
//! let mut client = VehicleClient::connect(RadioLink::new(), "radio://0/80/2M/E7E7E7E7E7", &variables).await;
//! client.wait_connected(Duration::from_secs(1)).await;
//!
//! client.move_smooth(Position::new(0.0, 0.0, 0.0), Position::new(0.0, 0.0, 0.5), 0.0, Duration::from_secs(2)).await?;
//! client.move_to(0.0, 0.0, 0.5, 0.0, Duration::from_secs(5)).await?;
//! client.land(Duration::ZERO).await?;
//!
//! client.disconnect().await;
//! client.persist("hover.json").await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use flume::Receiver;
use log::{debug, info, warn};
use tokio::time::{sleep, Instant};

use crate::controller::{Controller, CONTROLLER_PARAM, L1_GAIN_PARAMS, RESET_ESTIMATION_PARAM};
use crate::link::{group_variables, LinkEvent, LogConfig, VehicleLink, DEFAULT_LOG_PERIOD_MS};
use crate::session::Session;
use crate::setpoint::{Position, Setpoint};
use crate::telemetry::TelemetryBuffer;
use crate::{Error, Result};

/// Period at which setpoints are re-sent
pub const SETPOINT_PERIOD: Duration = Duration::from_millis(100);

/// Pause between the stop setpoint and the notify-stop command when landing
pub const LAND_NOTIFY_DELAY: Duration = Duration::from_millis(50);

/// Client for one Crazyflie
pub struct VehicleClient<L: VehicleLink> {
    link: L,
    session: Session,
    variables: Vec<String>,
    telemetry: TelemetryBuffer,
    log_configs: Vec<LogConfig>,
    events: Receiver<LinkEvent>,
}

impl<L: VehicleLink> VehicleClient<L> {
    /// Create a client and start connecting to `uri`
    ///
    /// Returns as soon as the link started connecting: use [VehicleClient::is_connected()] or
    /// [VehicleClient::wait_connected()] to know when the Crazyflie is ready. `variables` are the telemetry
    /// variables logged during the whole session, logging starts as soon as the connection is established.
    pub async fn connect(link: L, uri: &str, variables: &[String]) -> Self {
        let (tx, events) = flume::unbounded();

        let mut session = Session::new(uri);
        session.connecting();
        link.open(uri, tx).await;

        Self {
            link,
            session,
            variables: variables.to_vec(),
            telemetry: TelemetryBuffer::new(variables),
            log_configs: Vec::new(),
            events,
        }
    }

    /// Connection session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True when the Crazyflie is connected
    ///
    /// Only changes when link events are processed.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Telemetry recorded so far
    pub fn telemetry(&self) -> &TelemetryBuffer {
        &self.telemetry
    }

    /// Log configurations that have been successfully started
    pub fn log_configs(&self) -> &[LogConfig] {
        &self.log_configs
    }

    /// Process all pending link events
    ///
    /// Connection events update the session, telemetry is appended to the buffer and log errors are reported.
    /// Returns the number of events processed.
    pub async fn process_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events.try_recv() {
            processed += 1;
            match event {
                LinkEvent::Telemetry(sample) => {
                    self.telemetry.record(&sample);
                }
                LinkEvent::LogError(config, reason) => {
                    warn!("Error when logging {}: {}", config, reason);
                }
                event => {
                    if self.session.handle(&event) {
                        self.start_logging().await;
                    }
                }
            }
        }
        processed
    }

    async fn start_logging(&mut self) {
        self.log_configs.clear();

        for config in group_variables(&self.variables, DEFAULT_LOG_PERIOD_MS) {
            match self.link.start_log_config(&config).await {
                Ok(()) => {
                    debug!("Started {} ({} variables)", config.name, config.variables.len());
                    self.log_configs.push(config);
                }
                Err(e) => {
                    warn!("Could not start {} because {}", config.name, e);
                    for variable in &config.variables {
                        warn!(" - {}", variable);
                    }
                }
            }
        }
    }

    /// Wait for the connection to be established
    ///
    /// Polls the connection state every `poll`. There is no timeout: if the Crazyflie never answers this
    /// function never returns.
    pub async fn wait_connected(&mut self, poll: Duration) {
        self.process_events().await;
        while !self.is_connected() {
            info!(" ... connecting ...");
            sleep(poll).await;
            self.process_events().await;
        }
    }

    /// Wait for `duration` while processing link events
    pub async fn wait(&mut self, duration: Duration) {
        let start = Instant::now();
        loop {
            self.process_events().await;
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return;
            }
            sleep(SETPOINT_PERIOD.min(duration - elapsed)).await;
        }
    }

    /// Send one absolute position setpoint
    ///
    /// Position in meters and yaw in degrees. The setpoint is not acknowledged.
    pub async fn send_position_setpoint(&self, x: f32, y: f32, z: f32, yaw: f32) -> Result<()> {
        let sent = self
            .link
            .send_position_setpoint(Setpoint::new(x, y, z, yaw))
            .await;
        self.unless_lost("position setpoint", sent)
    }

    fn unless_lost(&self, command: &str, result: Result<()>) -> Result<()> {
        match result {
            Err(Error::Disconnected) => {
                debug!("Link to {} lost, {} dropped", self.session.uri(), command);
                Ok(())
            }
            result => result,
        }
    }

    /// Hold a position setpoint for `duration`
    ///
    /// The setpoint is sent every [SETPOINT_PERIOD], starting immediately.
    pub async fn move_to(&mut self, x: f32, y: f32, z: f32, yaw: f32, duration: Duration) -> Result<()> {
        let start = Instant::now();
        while start.elapsed() < duration {
            self.send_position_setpoint(x, y, z, yaw).await?;
            sleep(SETPOINT_PERIOD).await;
            self.process_events().await;
        }
        Ok(())
    }

    /// Move in a straight line from `from` to `to` in `duration`
    ///
    /// Every [SETPOINT_PERIOD] the setpoint `(1 - s) * from + s * to` is sent, with `s` the elapsed fraction of
    /// `duration`. The loop ends after sending the setpoint for `s >= 1`.
    pub async fn move_smooth(
        &mut self,
        from: Position,
        to: Position,
        yaw: f32,
        duration: Duration,
    ) -> Result<()> {
        let start = Instant::now();
        loop {
            let s = if duration.is_zero() {
                1.0
            } else {
                start.elapsed().as_secs_f32() / duration.as_secs_f32()
            };

            let p = from.lerp(to, s);
            self.send_position_setpoint(p.x, p.y, p.z, yaw).await?;

            if s >= 1.0 {
                return Ok(());
            }
            sleep(SETPOINT_PERIOD).await;
            self.process_events().await;
        }
    }

    /// Send a stop setpoint and stay idle for `duration`
    pub async fn stop(&mut self, duration: Duration) -> Result<()> {
        let sent = self.link.send_stop_setpoint().await;
        self.unless_lost("stop setpoint", sent)?;
        self.wait(duration).await;
        Ok(())
    }

    /// Stop the motors and hand the setpoint priority back to the Crazyflie
    ///
    /// Sends a stop setpoint and, [LAND_NOTIFY_DELAY] later, the notify-setpoint-stop command. Then stays idle
    /// for `duration`.
    pub async fn land(&mut self, duration: Duration) -> Result<()> {
        let start = Instant::now();

        let sent = self.link.send_stop_setpoint().await;
        self.unless_lost("stop setpoint", sent)?;
        sleep(LAND_NOTIFY_DELAY).await;
        let sent = self.link.send_notify_setpoint_stop().await;
        self.unless_lost("notify setpoint stop", sent)?;

        self.wait(duration.saturating_sub(start.elapsed())).await;
        Ok(())
    }

    /// Hold a position until the Crazyflie disconnects
    pub async fn hover(&mut self, x: f32, y: f32, z: f32, yaw: f32) -> Result<()> {
        while self.is_connected() {
            self.move_to(x, y, z, yaw, SETPOINT_PERIOD).await?;
            self.wait(SETPOINT_PERIOD).await;
        }
        Ok(())
    }

    /// Reset the Kalman state estimator
    pub async fn reset_estimator(&self) -> Result<()> {
        let sent = self.link.set_param(RESET_ESTIMATION_PARAM, 1.0).await;
        self.unless_lost(RESET_ESTIMATION_PARAM, sent)
    }

    /// Switch the active flight controller
    ///
    /// See [Controller] for the known names. An unknown name leaves the controller unchanged, it is reported as a
    /// warning and is not an error.
    pub async fn switch_controller(&self, name: &str) -> Result<()> {
        match name.parse::<Controller>() {
            Ok(controller) => {
                info!("Switching to the {:?} controller", controller);
                let sent = self
                    .link
                    .set_param(CONTROLLER_PARAM, controller.param_value().into())
                    .await;
                self.unless_lost(CONTROLLER_PARAM, sent)
            }
            Err(_) => {
                warn!(
                    "Controller {} is not supported, the controller will not be switched",
                    name
                );
                Ok(())
            }
        }
    }

    /// Set the 16 gains of the L1 controller, in the order of [L1_GAIN_PARAMS]
    pub async fn set_l1_gains(&self, gains: &[f64; 16]) -> Result<()> {
        for (name, gain) in L1_GAIN_PARAMS.iter().zip(gains.iter()) {
            let sent = self.link.set_param(name, *gain).await;
            self.unless_lost(name, sent)?;
        }
        Ok(())
    }

    /// Close the link
    pub async fn disconnect(&mut self) {
        self.link.close().await;
        self.process_events().await;
    }

    /// Write the telemetry to a new JSON file in the working directory
    ///
    /// Pending events are processed first. See [TelemetryBuffer::persist_in()] for the file naming.
    pub async fn persist(&mut self, base: &str) -> Result<PathBuf> {
        self.persist_in(Path::new("."), base).await
    }

    /// Write the telemetry to a new JSON file in `dir`
    pub async fn persist_in(&mut self, dir: &Path, base: &str) -> Result<PathBuf> {
        self.process_events().await;
        let path = self.telemetry.persist_in(dir, base)?;
        info!(
            "Wrote {} samples to {}",
            self.telemetry.len(),
            path.display()
        );
        Ok(path)
    }
}
