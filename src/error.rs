/// [Result] alias for return types of the crate API
pub type Result<T> = std::result::Result<T, Error>;

/// Error enum type
#[derive(Debug)]
pub enum Error {
    /// The link to the Crazyflie is closed or was never opened.
    Disconnected,
    /// A command was issued before the Crazyflie reported being connected.
    NotConnected,
    /// A log configuration could not be created or started. The String contains the reason.
    LogConfigError(String),
    /// Parameter write error. The String contains the reason.
    ParamError(String),
    /// Error reported by the Crazyflie lib. Returns the [error from the lib](crazyflie_lib::Error).
    VehicleError(crazyflie_lib::Error),
    /// Radio link error. Returns the [error from the Link](crazyflie_link::Error).
    LinkError(crazyflie_link::Error),
    /// Error while writing the telemetry file.
    IoError(std::io::Error),
    /// Error while serializing the telemetry buffer.
    SerializationError(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Disconnected => write!(f, "Crazyflie disconnected"),
            Error::NotConnected => write!(f, "Crazyflie not connected yet"),
            Error::LogConfigError(reason) => write!(f, "Log configuration error: {}", reason),
            Error::ParamError(reason) => write!(f, "Parameter error: {}", reason),
            Error::VehicleError(e) => write!(f, "Crazyflie error: {:?}", e),
            Error::LinkError(e) => write!(f, "Link error: {}", e),
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::SerializationError(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<crazyflie_lib::Error> for Error {
    fn from(error: crazyflie_lib::Error) -> Self {
        match error {
            crazyflie_lib::Error::Disconnected => Self::Disconnected,
            crazyflie_lib::Error::LinkError(e) => Self::LinkError(e),
            error => Self::VehicleError(error),
        }
    }
}

impl From<crazyflie_link::Error> for Error {
    fn from(error: crazyflie_link::Error) -> Self {
        Self::LinkError(error)
    }
}

impl<T> From<flume::SendError<T>> for Error {
    fn from(_: flume::SendError<T>) -> Self {
        Self::Disconnected
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(error)
    }
}
