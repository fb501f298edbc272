//! Remote device adapter.
//!
//! Maps a `(location, bay)` pair to a device through a static
//! [`DeviceDirectory`] and performs reset, reboot and door unlock either
//! against the vendor APIs or as a deterministic simulation.

pub mod adapter;
pub mod config;
pub mod directory;
pub mod error;
pub mod ninjaone;
pub mod unifi;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::{DeviceActionOutcome, DeviceAdapter, DeviceOperation, RemoteDeviceAdapter};
pub use config::{DeviceAdapterConfig, NinjaOneConfig, UnifiConfig};
pub use directory::{DeviceDirectory, DeviceMapping};
pub use error::DeviceError;
pub use ninjaone::NinjaOneClient;
pub use unifi::UnifiAccessClient;
