//! # Radio link
//!
//! [VehicleLink] implementation using `crazyflie-lib` to reach a real Crazyflie over a Crazyradio.
//!
//! The connection runs in a background task: it connects to the URI, reports [LinkEvent::Connected] and then
//! waits for the link to close to report the disconnection. Each started log configuration gets its own task
//! forwarding the log stream as [LinkEvent::Telemetry].
//!
//! The TOCs are cached on disk, in [DEFAULT_CACHE_DIR](crate::toc_cache::DEFAULT_CACHE_DIR) unless another
//! cache is given with [RadioLink::with_toc_cache()].

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use async_trait::async_trait;
use crazyflie_lib::subsystems::log::{LogPeriod, LogStream};
use crazyflie_lib::Crazyflie;
use crazyflie_link::LinkContext;
use flume::Sender;
use futures::lock::Mutex;
use log::debug;
use tokio::task::JoinHandle;

use crate::link::{LinkEvent, LogConfig, TelemetrySample, VehicleLink};
use crate::setpoint::Setpoint;
use crate::toc_cache::FileTocCache;
use crate::{Error, Result};

struct Opened {
    uri: String,
    events: Sender<LinkEvent>,
}

/// Link to a Crazyflie over radio
pub struct RadioLink {
    context: Arc<LinkContext>,
    toc_cache: FileTocCache,
    crazyflie: Arc<Mutex<Option<Arc<Crazyflie>>>>,
    opened: Mutex<Option<Opened>>,
    connecting: Mutex<Option<JoinHandle<()>>>,
    // Set once the connection is established, never cleared
    was_connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
}

impl RadioLink {
    /// Create a link, no radio is accessed until [VehicleLink::open()] is called
    pub fn new() -> Self {
        Self::with_toc_cache(FileTocCache::default())
    }

    /// Create a link caching the TOCs with `toc_cache`
    pub fn with_toc_cache(toc_cache: FileTocCache) -> Self {
        Self {
            context: Arc::new(LinkContext::new()),
            toc_cache,
            crazyflie: Arc::new(Mutex::new(None)),
            opened: Mutex::new(None),
            connecting: Mutex::new(None),
            was_connected: Arc::new(AtomicBool::new(false)),
            closing: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn connected(&self) -> Result<Arc<Crazyflie>> {
        let cf = self.crazyflie.lock().await.clone();
        match cf {
            Some(cf) => Ok(cf),
            None if self.was_connected.load(Relaxed) => Err(Error::Disconnected),
            None => Err(Error::NotConnected),
        }
    }

    async fn events(&self) -> Result<Sender<LinkEvent>> {
        self.opened
            .lock()
            .await
            .as_ref()
            .map(|opened| opened.events.clone())
            .ok_or(Error::Disconnected)
    }
}

impl Default for RadioLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VehicleLink for RadioLink {
    async fn open(&self, uri: &str, events: Sender<LinkEvent>) {
        self.closing.store(false, Relaxed);
        self.was_connected.store(false, Relaxed);
        *self.opened.lock().await = Some(Opened {
            uri: uri.to_owned(),
            events: events.clone(),
        });

        let context = self.context.clone();
        let toc_cache = self.toc_cache.clone();
        let slot = self.crazyflie.clone();
        let was_connected = self.was_connected.clone();
        let closing = self.closing.clone();
        let uri = uri.to_owned();

        let task = tokio::spawn(async move {
            let cf = match Crazyflie::connect_from_uri(&context, &uri, toc_cache).await {
                Ok(cf) => Arc::new(cf),
                Err(e) => {
                    let _ = events
                        .send_async(LinkEvent::ConnectionFailed(uri, format!("{:?}", e)))
                        .await;
                    return;
                }
            };

            {
                let mut slot = slot.lock().await;
                *slot = Some(cf.clone());
                was_connected.store(true, Relaxed);
            }
            let _ = events.send_async(LinkEvent::Connected(uri.clone())).await;

            let reason = cf.wait_disconnect().await;
            slot.lock().await.take();

            if !closing.load(Relaxed) {
                let _ = events
                    .send_async(LinkEvent::ConnectionLost(uri.clone(), reason))
                    .await;
            }
            let _ = events.send_async(LinkEvent::Disconnected(uri)).await;
        });
        *self.connecting.lock().await = Some(task);
    }

    async fn close(&self) {
        self.closing.store(true, Relaxed);

        let slot = self.crazyflie.lock().await;
        match slot.clone() {
            // The connection task reports the disconnection once the link is closed
            Some(cf) => {
                drop(slot);
                cf.disconnect().await;
            }
            // Lost link, already reported by the connection task
            None if self.was_connected.load(Relaxed) => (),
            None => {
                // Still connecting. The slot stays locked until the task is aborted so that it cannot report a
                // connection after the disconnection.
                if let Some(task) = self.connecting.lock().await.take() {
                    task.abort();
                }
                drop(slot);

                if let Some(opened) = self.opened.lock().await.as_ref() {
                    let _ = opened
                        .events
                        .send_async(LinkEvent::Disconnected(opened.uri.clone()))
                        .await;
                }
            }
        }
    }

    async fn send_position_setpoint(&self, setpoint: Setpoint) -> Result<()> {
        let cf = self.connected().await?;
        let Setpoint { position, yaw } = setpoint;
        cf.commander
            .setpoint_position(position.x, position.y, position.z, yaw)
            .await?;
        Ok(())
    }

    async fn send_stop_setpoint(&self) -> Result<()> {
        let cf = self.connected().await?;
        cf.commander.setpoint_stop().await?;
        Ok(())
    }

    async fn send_notify_setpoint_stop(&self) -> Result<()> {
        let cf = self.connected().await?;
        cf.commander.notify_setpoint_stop(0).await?;
        Ok(())
    }

    async fn set_param(&self, name: &str, value: f64) -> Result<()> {
        let cf = self.connected().await?;
        cf.param
            .set_lossy(name, value)
            .await
            .map_err(|e| Error::ParamError(format!("cannot set {} to {}: {:?}", name, value, e)))
    }

    async fn start_log_config(&self, config: &LogConfig) -> Result<()> {
        let cf = self.connected().await?;
        let events = self.events().await?;

        let mut block = cf
            .log
            .create_block()
            .await
            .map_err(|e| Error::LogConfigError(format!("{:?}", e)))?;
        for variable in &config.variables {
            block
                .add_variable(variable)
                .await
                .map_err(|e| Error::LogConfigError(format!("{}: {:?}", variable, e)))?;
        }

        let period = LogPeriod::from_millis(config.period_ms)
            .map_err(|e| Error::LogConfigError(format!("bad period: {:?}", e)))?;
        let stream = block
            .start(period)
            .await
            .map_err(|e| Error::LogConfigError(format!("{:?}", e)))?;

        let name = config.name.clone();
        let variables = config.variables.clone();
        let closing = self.closing.clone();

        tokio::spawn(async move {
            if let Err(e) = forward_log(&stream, &name, &variables, &events).await {
                if closing.load(Relaxed) {
                    debug!("{} stopped: {}", name, e);
                } else {
                    let _ = events
                        .send_async(LinkEvent::LogError(name, e.to_string()))
                        .await;
                }
            }
        });

        Ok(())
    }
}

// Only returns on error, when the stream ends or the client is gone
async fn forward_log(
    stream: &LogStream,
    name: &str,
    variables: &[String],
    events: &Sender<LinkEvent>,
) -> Result<()> {
    loop {
        let data = stream.next().await?;
        let values = variables
            .iter()
            .filter_map(|v| data.data.get(v).map(|value| (v.clone(), value.to_f64_lossy())))
            .collect();
        let sample = TelemetrySample {
            config: name.to_owned(),
            timestamp: data.timestamp,
            values,
        };
        events.send_async(LinkEvent::Telemetry(sample)).await?;
    }
}
