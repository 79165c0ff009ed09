//! # Position setpoints
//!
//! A setpoint is the target state sent to the Crazyflie flight controller. It stays valid until it is superseded
//! or until the firmware setpoint timeout kicks in, this is why the [client](crate::client) keeps re-sending
//! them at a fixed cadence.

/// Position in the world frame, in meters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// x coordinate (meters)
    pub x: f32,
    /// y coordinate (meters)
    pub y: f32,
    /// z coordinate (meters)
    pub z: f32,
}

impl Position {
    /// Create a position from its coordinates
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Linear interpolation between `self` and `to`
    ///
    /// Returns `(1 - s) * self + s * to`. `s` is not clamped: values outside `[0, 1]` extrapolate along the
    /// same line.
    pub fn lerp(&self, to: Position, s: f32) -> Position {
        Position {
            x: (1.0 - s) * self.x + s * to.x,
            y: (1.0 - s) * self.y + s * to.y,
            z: (1.0 - s) * self.z + s * to.z,
        }
    }
}

impl From<[f32; 3]> for Position {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Absolute position setpoint with yaw
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Setpoint {
    /// Target position (meters, world frame)
    pub position: Position,
    /// Target yaw angle (degrees, absolute)
    pub yaw: f32,
}

impl Setpoint {
    /// Create a setpoint from coordinates and yaw
    pub const fn new(x: f32, y: f32, z: f32, yaw: f32) -> Self {
        Self {
            position: Position::new(x, y, z),
            yaw,
        }
    }
}
