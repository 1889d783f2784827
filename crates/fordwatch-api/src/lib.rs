// fordwatch-api: Async Rust client for the FordPass telemetry API

pub mod error;
pub mod session;
pub mod telemetry;
pub mod token;
pub mod transport;

pub use error::Error;
pub use session::{Credentials, Endpoints, SessionManager};
pub use telemetry::{VehicleStatus, VehicleStatusClient};
pub use token::{Token, TokenStore};
pub use transport::TransportConfig;
