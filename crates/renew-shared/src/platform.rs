//! Host platform classification.
//!
//! Detected once when the daemon starts and never re-evaluated; every
//! command plan is selected by matching on this value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system family the daemon is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Windows,
    Linux,
    Unknown,
}

impl PlatformKind {
    /// Detect the platform of the running process.
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Classify an OS identification string.
    ///
    /// Case-insensitive substring match: anything mentioning "windows" is
    /// Windows, anything mentioning "linux" is Linux, the rest is Unknown.
    pub fn from_os_name(os_name: &str) -> Self {
        let lower = os_name.to_lowercase();
        if lower.contains("windows") {
            PlatformKind::Windows
        } else if lower.contains("linux") {
            PlatformKind::Linux
        } else {
            PlatformKind::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Windows => "windows",
            PlatformKind::Linux => "linux",
            PlatformKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_os_name_windows_variants() {
        assert_eq!(PlatformKind::from_os_name("windows"), PlatformKind::Windows);
        assert_eq!(PlatformKind::from_os_name("Windows 10"), PlatformKind::Windows);
        assert_eq!(PlatformKind::from_os_name("WINDOWS SERVER 2022"), PlatformKind::Windows);
    }

    #[test]
    fn test_from_os_name_linux_variants() {
        assert_eq!(PlatformKind::from_os_name("linux"), PlatformKind::Linux);
        assert_eq!(PlatformKind::from_os_name("Linux"), PlatformKind::Linux);
        assert_eq!(PlatformKind::from_os_name("GNU/Linux"), PlatformKind::Linux);
    }

    #[test]
    fn test_from_os_name_unknown() {
        assert_eq!(PlatformKind::from_os_name("macos"), PlatformKind::Unknown);
        assert_eq!(PlatformKind::from_os_name("freebsd"), PlatformKind::Unknown);
        assert_eq!(PlatformKind::from_os_name(""), PlatformKind::Unknown);
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&PlatformKind::Linux).unwrap();
        assert_eq!(json, "\"linux\"");
        assert_eq!(PlatformKind::Windows.to_string(), "windows");
    }
}
