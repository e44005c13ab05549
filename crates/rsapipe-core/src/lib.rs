pub mod config;
pub mod error;
pub mod types;

pub use error::{RsapipeError, RsapipeResult};
pub use types::Direction;
