// In-memory Crazyflie used by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use crazyflie_hover::link::{LinkEvent, LogConfig, TelemetrySample, VehicleLink};
use crazyflie_hover::setpoint::Setpoint;
use crazyflie_hover::{Error, Result};
use flume::Sender;
use tokio::time::Instant;

/// Command received by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Position(Setpoint),
    Stop,
    NotifyStop,
    Param(String, f64),
}

#[derive(Debug, Clone, Copy)]
enum ConnectBehavior {
    Immediate,
    After(Duration),
    Fail,
}

struct State {
    uri: String,
    events: Option<Sender<LinkEvent>>,
    commands: Vec<(Instant, Command)>,
    started: Vec<LogConfig>,
    rejected_variables: Vec<String>,
    disconnect_after: Option<usize>,
    failing_params: Vec<String>,
    lost: bool,
    closed: bool,
    timestamp: u32,
}

/// Mock link, clones share the same state
#[derive(Clone)]
pub struct MockLink {
    behavior: ConnectBehavior,
    state: Arc<Mutex<State>>,
}

impl MockLink {
    /// Connects as soon as the link is opened
    pub fn new() -> Self {
        Self::with_behavior(ConnectBehavior::Immediate)
    }

    /// Connects `delay` after the link is opened
    pub fn connecting_after(delay: Duration) -> Self {
        Self::with_behavior(ConnectBehavior::After(delay))
    }

    /// Never connects
    pub fn failing() -> Self {
        Self::with_behavior(ConnectBehavior::Fail)
    }

    fn with_behavior(behavior: ConnectBehavior) -> Self {
        Self {
            behavior,
            state: Arc::new(Mutex::new(State {
                uri: String::new(),
                events: None,
                commands: Vec::new(),
                started: Vec::new(),
                rejected_variables: Vec::new(),
                disconnect_after: None,
                failing_params: Vec::new(),
                lost: false,
                closed: false,
                timestamp: 0,
            })),
        }
    }

    /// Log configurations containing `variable` are refused
    pub fn reject_variable(self, variable: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .rejected_variables
            .push(variable.to_string());
        self
    }

    /// The link is lost after `n` position setpoints, later commands fail with [Error::Disconnected]
    pub fn disconnect_after(self, n: usize) -> Self {
        self.state.lock().unwrap().disconnect_after = Some(n);
        self
    }

    /// Writing the parameter `name` fails
    pub fn failing_param(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_params
            .push(name.to_string());
        self
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state
            .lock()
            .unwrap()
            .commands
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn timed_commands(&self) -> Vec<(Instant, Command)> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn setpoints(&self) -> Vec<Setpoint> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Position(setpoint) => Some(setpoint),
                _ => None,
            })
            .collect()
    }

    pub fn params(&self) -> Vec<(String, f64)> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Param(name, value) => Some((name, value)),
                _ => None,
            })
            .collect()
    }

    pub fn started(&self) -> Vec<LogConfig> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn is_lost(&self) -> bool {
        self.state.lock().unwrap().lost
    }

    // Commands sent on a lost or closed link never reach the Crazyflie
    fn record(&self, command: Command) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.lost || state.closed {
            return Err(Error::Disconnected);
        }
        state.commands.push((Instant::now(), command));
        Ok(())
    }
}

#[async_trait]
impl VehicleLink for MockLink {
    async fn open(&self, uri: &str, events: Sender<LinkEvent>) {
        {
            let mut state = self.state.lock().unwrap();
            state.uri = uri.to_string();
            state.events = Some(events.clone());
        }

        let uri = uri.to_string();
        match self.behavior {
            ConnectBehavior::Immediate => {
                let _ = events.send(LinkEvent::Connected(uri));
            }
            ConnectBehavior::After(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events.send(LinkEvent::Connected(uri));
                });
            }
            ConnectBehavior::Fail => {
                let _ = events.send(LinkEvent::ConnectionFailed(uri, "no answer".to_string()));
            }
        }
    }

    async fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        if let Some(events) = &state.events {
            let _ = events.send(LinkEvent::Disconnected(state.uri.clone()));
        }
    }

    async fn send_position_setpoint(&self, setpoint: Setpoint) -> Result<()> {
        self.record(Command::Position(setpoint))?;

        let mut state = self.state.lock().unwrap();
        state.timestamp += 10;
        let timestamp = state.timestamp;
        let events = state.events.clone().ok_or(Error::NotConnected)?;
        for config in &state.started {
            let sample = TelemetrySample {
                config: config.name.clone(),
                timestamp,
                values: config
                    .variables
                    .iter()
                    .map(|v| (v.clone(), timestamp as f64 / 1000.0))
                    .collect(),
            };
            let _ = events.send(LinkEvent::Telemetry(sample));
        }

        let sent = state
            .commands
            .iter()
            .filter(|(_, c)| matches!(c, Command::Position(_)))
            .count();
        if state.disconnect_after == Some(sent) {
            state.lost = true;
            let _ = events.send(LinkEvent::ConnectionLost(state.uri.clone(), "too far".to_string()));
            let _ = events.send(LinkEvent::Disconnected(state.uri.clone()));
        }
        Ok(())
    }

    async fn send_stop_setpoint(&self) -> Result<()> {
        self.record(Command::Stop)
    }

    async fn send_notify_setpoint_stop(&self) -> Result<()> {
        self.record(Command::NotifyStop)
    }

    async fn set_param(&self, name: &str, value: f64) -> Result<()> {
        if self.state.lock().unwrap().failing_params.iter().any(|p| p == name) {
            return Err(Error::ParamError(format!("{} not found in TOC", name)));
        }
        self.record(Command::Param(name.to_string(), value))
    }

    async fn start_log_config(&self, config: &LogConfig) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(bad) = config
            .variables
            .iter()
            .find(|v| state.rejected_variables.contains(v))
        {
            return Err(Error::LogConfigError(format!("{} not found in TOC", bad)));
        }
        state.started.push(config.clone());
        Ok(())
    }
}
