//! Mock device implementation for testing and development.
//!
//! This module provides a simulated device that can be scripted and
//! observed programmatically without requiring physical hardware.

pub mod device;

pub use device::{MockDevice, MockDeviceHandle};
