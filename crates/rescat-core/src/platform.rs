//! # Target Platforms
//!
//! The fixed list of build targets. Platforms are always built in the
//! order of [`Platform::ALL`], regardless of the order the caller selected
//! them in.

use serde::{Deserialize, Serialize};

/// A build target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// 32-bit Windows.
    Windows,
    /// 64-bit Windows.
    Windows64,
    /// macOS.
    MacOs,
    /// Linux.
    Linux,
    /// iOS.
    Ios,
    /// Android.
    Android,
    /// Windows Store (UWP).
    WindowsStore,
    /// WebGL.
    WebGl,
}

impl Platform {
    /// Every platform in build order.
    pub const ALL: [Platform; 8] = [
        Self::Windows,
        Self::Windows64,
        Self::MacOs,
        Self::Linux,
        Self::Ios,
        Self::Android,
        Self::WindowsStore,
        Self::WebGl,
    ];

    /// The directory name used for this platform in every output tree.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Windows64 => "Windows64",
            Self::MacOs => "MacOS",
            Self::Linux => "Linux",
            Self::Ios => "IOS",
            Self::Android => "Android",
            Self::WindowsStore => "WindowsStore",
            Self::WebGl => "WebGL",
        }
    }

    /// Sort and deduplicate a selection into build order.
    pub fn in_build_order(selected: &[Platform]) -> Vec<Platform> {
        Self::ALL
            .iter()
            .copied()
            .filter(|p| selected.contains(p))
            .collect()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    /// Parse a platform name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown platform {s:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("android".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!("WebGL".parse::<Platform>().unwrap(), Platform::WebGl);
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::MacOs);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("amiga".parse::<Platform>().is_err());
    }

    #[test]
    fn build_order_is_fixed() {
        let order = Platform::in_build_order(&[Platform::Android, Platform::Windows, Platform::Android]);
        assert_eq!(order, vec![Platform::Windows, Platform::Android]);
    }

    #[test]
    fn display_matches_directory_name() {
        for p in Platform::ALL {
            assert_eq!(p.to_string(), p.as_str());
        }
    }
}
