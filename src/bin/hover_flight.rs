// Tuning flight: takeoff, hover for 10 seconds and land, recording the state estimate
//
// Usage: hover_flight [URI]

use crazyflie_hover::flight::FlightPlan;
use crazyflie_hover::radio::RadioLink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let plan = match std::env::args().nth(1) {
        Some(uri) => FlightPlan::with_uri(&uri),
        None => FlightPlan::default(),
    };

    let path = plan.run(RadioLink::new()).await?;
    println!("Flight data written to {}", path.display());

    Ok(())
}
