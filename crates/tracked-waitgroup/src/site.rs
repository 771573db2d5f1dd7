use compact_str::CompactString;
use std::fmt;
use std::panic::Location;

/// Identity of the place that registered outstanding work.
///
/// Registrations that share a `Site` are aggregated into a single entry.
/// The identity is usually the caller's `file:line`, but any label works.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Site(CompactString);

impl Site {
    /// Site of the calling code, rendered as `file:line`.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self(compact_str::format_compact!(
            "{}:{}",
            location.file(),
            location.line()
        ))
    }

    /// Explicit label.
    pub fn new(label: impl Into<CompactString>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Site {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Site {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&Site> for Site {
    fn from(value: &Site) -> Self {
        value.clone()
    }
}

impl AsRef<str> for Site {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
