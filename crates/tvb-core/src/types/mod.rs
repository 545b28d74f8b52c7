//! Core data types: enums, parsed alerts, order requests and broker snapshots.

pub mod enums;
pub mod signal;
pub mod trading;

pub use enums::*;
pub use signal::*;
pub use trading::*;
