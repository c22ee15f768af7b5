pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use config::{AppConfig, CacheConfig, ClassifierConfig, ControlConfig, StatsConfig};
pub use error::{OffgateError, OffgateResult};
pub use request::{Destination, GatewayRequest, RequestMeta};
pub use response::{synthetic, ResponseSnapshot};
