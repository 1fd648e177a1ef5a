pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::CraneBotConfig;
pub use error::{CraneBotError, Result};
pub use events::DomainEvent;
pub use types::*;
