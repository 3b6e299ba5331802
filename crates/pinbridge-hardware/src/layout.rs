//! Key layouts.
//!
//! A layout maps the command tokens clients send (`HOME`, `OPEN`, `5`, ...)
//! to the code a particular device expects on the wire. Layouts are TOML
//! files:
//!
//! ```toml
//! name = "Front door keypad"
//!
//! [commands]
//! HOME = "H"
//! OPEN = "K#"
//! "5" = "K5"
//! ```

use crate::error::{HardwareError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Command token to device code table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyLayout {
    /// Human-readable layout name.
    pub name: String,

    #[serde(default)]
    commands: HashMap<String, String>,
}

impl KeyLayout {
    /// Create an empty layout.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: HashMap::new(),
        }
    }

    /// Add a token mapping.
    pub fn with_command(mut self, token: impl Into<String>, code: impl Into<String>) -> Self {
        self.commands.insert(token.into(), code.into());
        self
    }

    /// Load a layout file.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the file cannot be
    /// read or is not a valid layout.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            HardwareError::initialization_failed(format!(
                "cannot read layout {}: {}",
                path.display(),
                e
            ))
        })?;

        text.parse().map_err(|e: HardwareError| {
            HardwareError::initialization_failed(format!("{}: {}", path.display(), e))
        })
    }

    /// Device code for a command token.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::UnknownCommand` if the layout has no entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinbridge_hardware::layout::KeyLayout;
    ///
    /// let layout = KeyLayout::new("Lobby").with_command("HOME", "H");
    ///
    /// assert_eq!(layout.code_for("HOME").unwrap(), "H");
    /// assert!(layout.code_for("OPEN").is_err());
    /// ```
    pub fn code_for(&self, token: &str) -> Result<&str> {
        self.commands
            .get(token)
            .map(String::as_str)
            .ok_or_else(|| HardwareError::unknown_command(token))
    }

    /// Whether the layout knows a token.
    pub fn contains(&self, token: &str) -> bool {
        self.commands.contains_key(token)
    }

    /// Number of mapped tokens.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no token is mapped.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::str::FromStr for KeyLayout {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self> {
        let layout: KeyLayout =
            toml::from_str(s).map_err(|e| HardwareError::configuration(e.to_string()))?;

        if let Some((token, _)) = layout.commands.iter().find(|(_, code)| code.is_empty()) {
            return Err(HardwareError::configuration(format!(
                "command {} has an empty code",
                token
            )));
        }

        Ok(layout)
    }
}
