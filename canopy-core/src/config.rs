//! Runtime Configuration
//!
//! Knobs that change how a component participates in dependency
//! resolution. A component's configuration is fixed when it is created.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-component runtime settings.
///
/// Every field has a default, so a partial JSON document is valid:
///
/// ```rust,ignore
/// let config = RuntimeConfig::from_json(r#"{ "self_provides": false }"#)?;
/// assert!(config.strict_accessors);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Drop cached providers when the component disconnects.
    ///
    /// With this off, an accessor keeps serving the last provider it saw
    /// after disconnect. Reconnecting dispatches a fresh request either way.
    pub strict_accessors: bool,

    /// Let the component's own provider registrations answer requests it
    /// issues itself. When off, propagation starts at the parent.
    pub self_provides: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            strict_accessors: true,
            self_provides: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
