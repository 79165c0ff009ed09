//! # Crazyflie hover
//!
//! This crate flies a Crazyflie through a scripted takeoff, hover and landing while recording telemetry, and
//! writes the recorded telemetry to a JSON file at the end of the flight. It is used to compare flight
//! controllers on the same maneuver.
//!
//! The radio, the CRTP protocol and the Crazyflie subsystems are handled by [crazyflie-lib]. This crate only
//! adds the flight logic on top of it.
//!
//! ## Structure
//!
//! | Module | Role |
//! |--------|------|
//! | [link] | [VehicleLink](link::VehicleLink) trait, the boundary with the radio stack, and link events |
//! | [radio] | [RadioLink](radio::RadioLink), the `crazyflie-lib` implementation of the link |
//! | [toc_cache] | On-disk cache of the Crazyflie TOCs, used by the radio link |
//! | [session] | Connection state tracking |
//! | [telemetry] | Telemetry buffer and JSON output |
//! | [client] | [VehicleClient](client::VehicleClient): setpoint loops, parameters and telemetry capture |
//! | [flight] | The takeoff/hover/land tuning flight |
//!
//! ## Usage
//!
//! The basic procedure to fly is:
//!  - Create a [VehicleClient](client::VehicleClient) from a link, a URI and the telemetry variables to log
//!  - Wait for the connection, logging starts automatically once connected
//!  - Use the motion primitives of the client: they keep re-sending setpoints and recording telemetry
//!  - Disconnect and persist the telemetry
//!
//! The [flight] module does all of this for the tuning flight:
//! ``` no_run
//! # async fn test() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = crazyflie_hover::flight::FlightPlan::with_uri("radio://0/80/2M/E7E7E7E7E7");
//! let path = plan.run(crazyflie_hover::radio::RadioLink::new()).await?;
//! println!("Telemetry written to {}", path.display());
//! # Ok(())
//! # }
//! ```
//!
//! [crazyflie-lib]: https://crates.io/crates/crazyflie-lib

#![warn(missing_docs)]

mod error;

pub mod client;
pub mod controller;
pub mod flight;
pub mod link;
pub mod radio;
pub mod session;
pub mod setpoint;
pub mod telemetry;
pub mod toc_cache;

pub use crate::error::{Error, Result};
