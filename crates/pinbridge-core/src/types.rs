use crate::{
    Result,
    constants::{HARDWARE_ADDRESS_LEN, HARDWARE_ADDRESS_SEPARATORS, MAX_MAGIC_LEN},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Hardware (MAC) address of a device interface.
///
/// Immutable, fixed length. Used as the discovery cache key, so two values
/// compare equal exactly when their bytes do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HardwareAddress([u8; HARDWARE_ADDRESS_LEN]);

impl HardwareAddress {
    /// Create a hardware address from its raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; HARDWARE_ADDRESS_LEN]) -> Self {
        HardwareAddress(bytes)
    }

    /// Create a hardware address from a byte slice.
    ///
    /// # Errors
    /// Returns `Error::InvalidHardwareAddress` if the slice is not exactly
    /// six bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; HARDWARE_ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidHardwareAddress(format!(
                "expected {HARDWARE_ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(HardwareAddress(array))
    }

    /// Get the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; HARDWARE_ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl std::str::FromStr for HardwareAddress {
    type Err = Error;

    /// Parse `00:1b:c5:00:00:01` or `00-1B-C5-00-00-01`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidHardwareAddress(s.to_string());

        let mut bytes = [0u8; HARDWARE_ADDRESS_LEN];
        let mut parts = s.trim().split(HARDWARE_ADDRESS_SEPARATORS);

        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(HardwareAddress(bytes))
    }
}

impl TryFrom<String> for HardwareAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HardwareAddress> for String {
    fn from(value: HardwareAddress) -> Self {
        value.to_string()
    }
}

/// Shared token identifying the discovery protocol family.
///
/// Every probe and every reply starts with these bytes; datagrams that do
/// not are not ours and get dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MagicToken(Vec<u8>);

impl MagicToken {
    /// Create a magic token from text.
    ///
    /// # Errors
    /// Returns `Error::InvalidMagicToken` if the token is empty, longer than
    /// `MAX_MAGIC_LEN` bytes, or not ASCII.
    pub fn new(token: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::InvalidMagicToken("token is empty".to_string()));
        }
        if token.len() > MAX_MAGIC_LEN {
            return Err(Error::InvalidMagicToken(format!(
                "token must be at most {MAX_MAGIC_LEN} bytes, got {}",
                token.len()
            )));
        }
        if !token.is_ascii() {
            return Err(Error::InvalidMagicToken("token must be ASCII".to_string()));
        }
        Ok(MagicToken(token.as_bytes().to_vec()))
    }

    /// Get the token bytes as sent on the wire.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes the token occupies at the start of a datagram.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: construction rejects empty tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Strip the token from the start of `datagram`.
    ///
    /// Returns the remaining payload, or `None` if the datagram does not
    /// start with this token.
    #[must_use]
    pub fn strip<'a>(&self, datagram: &'a [u8]) -> Option<&'a [u8]> {
        datagram.strip_prefix(self.0.as_slice())
    }
}

impl fmt::Display for MagicToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl std::str::FromStr for MagicToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MagicToken::new(s)
    }
}

/// Logical key naming a device independently of its network address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Create a device key.
    ///
    /// The key is trimmed before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceKey` if the key is empty after trimming.
    pub fn new(key: &str) -> Result<Self> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidDeviceKey("key is empty".to_string()));
        }
        Ok(DeviceKey(key.to_string()))
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for DeviceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for DeviceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceKey::new(s)
    }
}

impl TryFrom<String> for DeviceKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DeviceKey::new(&value)
    }
}

impl From<DeviceKey> for String {
    fn from(value: DeviceKey) -> Self {
        value.0
    }
}

/// Kind of peripheral behind a device key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// PIN-entry terminal, statically addressed by IP and port.
    Terminal,
    /// Card multiplexer, located by hardware address.
    Multiplexer,
    /// Magnetic-stripe reader, located by hardware address.
    #[serde(alias = "magstripe_reader", alias = "magstripe-reader")]
    Magstripe,
}

impl DeviceKind {
    /// Returns `true` if the device is located through discovery.
    #[inline]
    #[must_use]
    pub fn is_discovered(self) -> bool {
        !matches!(self, DeviceKind::Terminal)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceKind::Terminal => write!(f, "Terminal"),
            DeviceKind::Multiplexer => write!(f, "Multiplexer"),
            DeviceKind::Magstripe => write!(f, "Magstripe reader"),
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terminal" => Ok(DeviceKind::Terminal),
            "multiplexer" | "mux" => Ok(DeviceKind::Multiplexer),
            "magstripe" | "magstripe_reader" | "magstripe-reader" => Ok(DeviceKind::Magstripe),
            _ => Err(Error::UnknownDeviceKind(s.to_string())),
        }
    }
}
