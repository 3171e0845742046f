pub mod config;
pub mod error;
pub mod experiment;
pub mod grid;
pub mod instance;
pub mod logging;
pub mod result;
pub mod scenario;
pub mod sink;
pub mod solver;
pub mod summary;
pub mod sweep;

pub use error::{Result, SweepError};
