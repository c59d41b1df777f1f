//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every table carries one merge-key column holding seconds as `f64`
//! - Video frames carry no capture time; they are given a synthetic timestamp
//!   spread evenly over the sensor timeline

mod decoder;
mod error;
mod frame;
mod provider;
mod sync_config;
mod table;

pub use decoder::{FrameDecoder, FrameStream};
pub use error::*;
pub use frame::*;
pub use provider::FileSystemProvider;
pub use sync_config::*;
pub use table::*;
