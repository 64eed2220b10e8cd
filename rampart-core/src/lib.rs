mod config;
mod constants;
mod error;
mod outcome;
mod stats;
mod threshold;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use outcome::*;
pub use stats::*;
pub use threshold::*;
