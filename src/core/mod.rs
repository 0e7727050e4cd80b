pub mod disambiguation;
pub mod identify;
pub mod package;
pub mod registry;

pub use crate::domain::model::{TrackingEvent, TrackingInfo};
pub use crate::domain::ports::{Carrier, ConfigProvider, Transport};
pub use crate::utils::error::Result;
