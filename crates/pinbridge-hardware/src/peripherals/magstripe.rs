//! Magnetic-stripe reader.

use pinbridge_core::DeviceKind;

discovered_device! {
    /// Magnetic-stripe reader located through discovery.
    MagstripeReader, DeviceKind::Magstripe
}
