//! # Flight controller selection
//!
//! The Crazyflie firmware contains several controllers, the active one is selected with the
//! `stabilizer.controller` parameter. Only the controllers used by the tuning flights are known here.

use std::str::FromStr;

use crate::Error;

/// Parameter selecting the active controller
pub const CONTROLLER_PARAM: &str = "stabilizer.controller";

/// Parameter that resets the Kalman state estimator when set to 1
pub const RESET_ESTIMATION_PARAM: &str = "kalman.resetEstimation";

/// Gains of the L1 controller, in the order expected by [crate::client::VehicleClient::set_l1_gains()]
pub const L1_GAIN_PARAMS: [&str; 16] = [
    "ctrlL1params.kp_x",
    "ctrlL1params.kp_y",
    "ctrlL1params.kp_z",
    "ctrlL1params.kv_x",
    "ctrlL1params.kv_y",
    "ctrlL1params.kv_z",
    "ctrlL1params.kr_x",
    "ctrlL1params.kr_y",
    "ctrlL1params.kr_z",
    "ctrlL1params.ko_x",
    "ctrlL1params.ko_y",
    "ctrlL1params.ko_z",
    "ctrlL1params.w_f1",
    "ctrlL1params.w_f2",
    "ctrlL1params.w_m1",
    "ctrlL1params.w_m2",
];

/// Known flight controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
    /// Mellinger geometric controller
    Mellinger,
    /// L1 adaptive controller
    L1,
}

impl Controller {
    /// Value of [CONTROLLER_PARAM] selecting this controller
    pub fn param_value(&self) -> u8 {
        match self {
            Controller::Mellinger => 2,
            Controller::L1 => 5,
        }
    }
}

impl FromStr for Controller {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "Mellinger" | "mellinger" | "MELLINGER" => Ok(Controller::Mellinger),
            "L1" | "l1" => Ok(Controller::L1),
            _ => Err(Error::ParamError(format!("Unknown controller {}", name))),
        }
    }
}
