//! Card multiplexer.

use pinbridge_core::DeviceKind;

discovered_device! {
    /// Card multiplexer located through discovery.
    ///
    /// Routes card-insertion commands to one of several slots; command tokens
    /// name the slot action and the layout maps them to multiplexer codes.
    CardMultiplexer, DeviceKind::Multiplexer
}
