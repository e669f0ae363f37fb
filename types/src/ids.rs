use std::fmt;

/// Composite identifier for a tracked stronghold.
///
/// Identity is derived, not generated: the warzone number and the two map
/// coordinates joined with `:` (e.g. `"12:448:512"`). Creating a stronghold
/// with the same triple therefore upserts the existing record rather than
/// producing a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StrongholdId(String);

impl StrongholdId {
    /// Delimiter between warzone and coordinates.
    pub const DELIMITER: char = ':';

    #[must_use]
    pub fn from_parts(warzone: i32, coordinate_x: i32, coordinate_y: i32) -> Self {
        Self(format!(
            "{warzone}{d}{coordinate_x}{d}{coordinate_y}",
            d = Self::DELIMITER
        ))
    }

    /// Wrap an identifier received from an external caller or the store.
    ///
    /// No shape validation: an identifier that never existed simply fails
    /// lookup downstream.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StrongholdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StrongholdId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
