//! The sensor module turns configured sensor profiles into decoded readings.

pub mod acquisition;
pub mod profile;

pub use acquisition::{poll_channels, poll_profile, poll_sensor};
pub use profile::{SensorProfile, SubChannel};
