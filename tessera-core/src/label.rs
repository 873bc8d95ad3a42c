//! Connector label type for identifying connectors.
//!
//! `ConnectorLabel` is a newtype wrapper around `SmolStr` used in tracing
//! fields, metrics labels and for naming decorated connectors.

use smol_str::SmolStr;
use std::fmt;

/// A label identifying a connector.
///
/// # Example
/// ```
/// use tessera_core::ConnectorLabel;
///
/// let label = ConnectorLabel::new("fallback");
/// let composed = label.compose(&ConnectorLabel::new("moka"));
/// assert_eq!(composed.as_str(), "fallback.moka");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConnectorLabel(SmolStr);

impl ConnectorLabel {
    /// Creates a new connector label.
    #[inline]
    pub fn new(s: impl Into<SmolStr>) -> Self {
        Self(s.into())
    }

    /// Creates a connector label from a static string (no allocation).
    #[inline]
    pub const fn new_static(s: &'static str) -> Self {
        Self(SmolStr::new_static(s))
    }

    /// Returns the label as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Composes two labels with a dot separator: "self.other".
    #[inline]
    pub fn compose(&self, other: &ConnectorLabel) -> Self {
        Self(SmolStr::from(format!("{}.{}", self.0, other.0)))
    }
}

impl fmt::Display for ConnectorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ConnectorLabel {
    fn from(s: &'static str) -> Self {
        Self::new_static(s)
    }
}
