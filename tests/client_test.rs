// Vehicle client behavior against an in-memory Crazyflie

mod common;

use std::time::Duration;

use common::{Command, MockLink};
use crazyflie_hover::client::VehicleClient;
use crazyflie_hover::session::ConnectionState;
use crazyflie_hover::setpoint::Position;

const URI: &str = "radio://0/80/2M/E7E7E7E7E7";

fn variables(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("test.var{}", i)).collect()
}

async fn connected_client(link: MockLink, variables: &[String]) -> VehicleClient<MockLink> {
    let mut client = VehicleClient::connect(link, URI, variables).await;
    client.wait_connected(Duration::from_millis(100)).await;
    client
}

#[tokio::test(start_paused = true)]
async fn logging_starts_once_connected() {
    let link = MockLink::new();
    let client = connected_client(link.clone(), &variables(12)).await;

    assert!(client.is_connected());
    let started: Vec<String> = link.started().iter().map(|c| c.name.clone()).collect();
    assert_eq!(started, vec!["LogConf0", "LogConf1", "LogConf2"]);
    assert_eq!(client.log_configs().len(), 3);
    assert!(link.started().iter().all(|c| c.variables.len() <= 5));
}

#[tokio::test(start_paused = true)]
async fn rejected_log_config_does_not_block_the_others() {
    let link = MockLink::new().reject_variable("test.var2");
    let client = connected_client(link.clone(), &variables(8)).await;

    let started: Vec<String> = client.log_configs().iter().map(|c| c.name.clone()).collect();
    assert_eq!(started, vec!["LogConf1"]);
    assert_eq!(link.started()[0].variables, vec!["test.var5", "test.var6", "test.var7"]);
}

#[tokio::test(start_paused = true)]
async fn wait_connected_polls_until_connected() {
    let link = MockLink::connecting_after(Duration::from_millis(2500));
    let mut client = VehicleClient::connect(link, URI, &variables(1)).await;

    assert_eq!(client.session().state(), ConnectionState::Connecting);
    assert!(!client.is_connected());

    let start = tokio::time::Instant::now();
    client.wait_connected(Duration::from_secs(1)).await;

    assert!(client.is_connected());
    assert!(start.elapsed() >= Duration::from_millis(2500));
}

#[tokio::test(start_paused = true)]
async fn failed_connection_leaves_client_disconnected() {
    let mut client = VehicleClient::connect(MockLink::failing(), URI, &variables(1)).await;

    assert_eq!(client.process_events().await, 1);
    assert_eq!(client.session().state(), ConnectionState::Disconnected);
    assert!(client.log_configs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn move_to_resends_setpoint() {
    let link = MockLink::new();
    let mut client = connected_client(link.clone(), &[]).await;

    client
        .move_to(0.0, 0.0, 0.5, 10.0, Duration::from_secs(1))
        .await
        .unwrap();

    let setpoints = link.setpoints();
    assert_eq!(setpoints.len(), 10);
    assert!(setpoints
        .iter()
        .all(|s| s.position == Position::new(0.0, 0.0, 0.5) && s.yaw == 10.0));

    let times: Vec<_> = link.timed_commands().iter().map(|(t, _)| *t).collect();
    for pair in times.windows(2) {
        let period = pair[1] - pair[0];
        assert!(period >= Duration::from_millis(100) && period < Duration::from_millis(110));
    }
}

#[tokio::test(start_paused = true)]
async fn move_to_zero_duration_sends_nothing() {
    let link = MockLink::new();
    let mut client = connected_client(link.clone(), &[]).await;

    client.move_to(0.0, 0.0, 0.5, 0.0, Duration::ZERO).await.unwrap();
    assert!(link.setpoints().is_empty());
}

#[tokio::test(start_paused = true)]
async fn move_smooth_interpolates_linearly() {
    let link = MockLink::new();
    let mut client = connected_client(link.clone(), &[]).await;

    let from = Position::new(0.0, 0.0, 0.1);
    let to = Position::new(1.0, -1.0, 0.5);
    client
        .move_smooth(from, to, 0.0, Duration::from_millis(500))
        .await
        .unwrap();

    let setpoints = link.setpoints();
    assert_eq!(setpoints.len(), 6);
    assert_eq!(setpoints[0].position, from);

    for (i, setpoint) in setpoints.iter().enumerate() {
        let expected = from.lerp(to, i as f32 * 0.2);
        assert!((setpoint.position.x - expected.x).abs() < 1e-2);
        assert!((setpoint.position.y - expected.y).abs() < 1e-2);
        assert!((setpoint.position.z - expected.z).abs() < 1e-2);
        // Every sample lies on the segment line: y = -x, z = 0.1 + 0.4 x
        assert!((setpoint.position.y + setpoint.position.x).abs() < 1e-5);
        assert!((setpoint.position.z - (0.1 + 0.4 * setpoint.position.x)).abs() < 1e-5);
    }

    let last = setpoints.last().unwrap().position;
    assert!(last.x >= to.x - 1e-5);
    assert!(last.z >= to.z - 1e-5);
}

#[tokio::test(start_paused = true)]
async fn move_smooth_zero_duration_goes_to_target() {
    let link = MockLink::new();
    let mut client = connected_client(link.clone(), &[]).await;

    let to = Position::new(0.0, 0.0, 0.3);
    client
        .move_smooth(Position::default(), to, 0.0, Duration::ZERO)
        .await
        .unwrap();

    let setpoints = link.setpoints();
    assert_eq!(setpoints.len(), 1);
    assert_eq!(setpoints[0].position, to);
}

#[tokio::test(start_paused = true)]
async fn stop_then_idle() {
    let link = MockLink::new();
    let mut client = connected_client(link.clone(), &[]).await;

    let start = tokio::time::Instant::now();
    client.stop(Duration::from_secs(1)).await.unwrap();

    assert_eq!(link.commands(), vec![Command::Stop]);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1100));
}

#[tokio::test(start_paused = true)]
async fn land_sends_stop_then_notify() {
    let link = MockLink::new();
    let mut client = connected_client(link.clone(), &[]).await;

    client.land(Duration::ZERO).await.unwrap();

    let commands = link.timed_commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].1, Command::Stop);
    assert_eq!(commands[1].1, Command::NotifyStop);
    let delay = commands[1].0 - commands[0].0;
    assert!(delay >= Duration::from_millis(50) && delay < Duration::from_millis(60));
}

#[tokio::test(start_paused = true)]
async fn hover_until_disconnected() {
    let link = MockLink::new().disconnect_after(5);
    let mut client = connected_client(link.clone(), &[]).await;

    client.hover(0.0, 0.0, 0.5, 0.0).await.unwrap();

    assert!(!client.is_connected());
    assert_eq!(link.setpoints().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn commands_after_link_loss_are_dropped() {
    let link = MockLink::new().disconnect_after(2);
    let mut client = connected_client(link.clone(), &[]).await;

    client
        .move_to(0.0, 0.0, 0.5, 0.0, Duration::from_millis(500))
        .await
        .unwrap();
    assert!(!client.is_connected());

    // The script keeps its timing on a lost link
    let start = tokio::time::Instant::now();
    client.stop(Duration::from_millis(300)).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(300));

    client.land(Duration::ZERO).await.unwrap();
    client.reset_estimator().await.unwrap();
    client.switch_controller("L1").await.unwrap();

    assert_eq!(link.setpoints().len(), 2);
    assert_eq!(link.commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn switch_controller() {
    let link = MockLink::new();
    let client = connected_client(link.clone(), &[]).await;

    client.switch_controller("mellinger").await.unwrap();
    client.switch_controller("L1").await.unwrap();

    assert_eq!(
        link.params(),
        vec![
            ("stabilizer.controller".to_string(), 2.0),
            ("stabilizer.controller".to_string(), 5.0),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_controller_is_not_switched() {
    let link = MockLink::new();
    let client = connected_client(link.clone(), &[]).await;

    client.switch_controller("pid").await.unwrap();

    assert!(link.params().is_empty());
}

#[tokio::test(start_paused = true)]
async fn l1_gains_are_written_in_order() {
    let link = MockLink::new();
    let client = connected_client(link.clone(), &[]).await;

    let gains: Vec<f64> = (0..16).map(|i| i as f64).collect();
    let gains: [f64; 16] = gains.try_into().unwrap();
    client.set_l1_gains(&gains).await.unwrap();

    let params = link.params();
    assert_eq!(params.len(), 16);
    assert_eq!(params[0], ("ctrlL1params.kp_x".to_string(), 0.0));
    assert_eq!(params[15], ("ctrlL1params.w_m2".to_string(), 15.0));
}

#[tokio::test(start_paused = true)]
async fn telemetry_is_buffered_while_flying() {
    let vars = variables(7);
    let link = MockLink::new();
    let mut client = connected_client(link.clone(), &vars).await;

    client
        .move_to(0.0, 0.0, 0.5, 0.0, Duration::from_millis(500))
        .await
        .unwrap();
    client.disconnect().await;

    assert!(link.is_closed());
    assert!(!client.is_connected());

    for name in &vars {
        let series = client.telemetry().get(name).unwrap();
        assert_eq!(series.time, vec![10, 20, 30, 40, 50]);
        assert!(series.time.windows(2).all(|w| w[0] < w[1]));
    }
}
