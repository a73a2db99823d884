pub mod batch;
pub mod clone;
pub mod config;
pub mod error;
pub mod humanize;
pub mod observability;
pub mod resolver;
pub mod transport;

pub use error::{PrismError, Result};
