//! Target platform catalog and family-specific packaging.
//!
//! Every supported platform identifier maps to exactly one packaging family:
//!
//! | Platform | Family | Module |
//! |----------|--------|--------|
//! | `win-x64`, `win-x86`, `win-arm64` | MSI | [`windows`] |
//! | `linux-x64`, `linux-arm64` | DEB | [`linux`] |
//!
//! The catalog is fixed at compile time; lookups are pure.

pub mod linux;
pub mod windows;

use crate::bundler::error::{Error, Result};
use std::fmt;

/// Installer technology used by a platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingFamily {
    /// Windows Installer package built from a WiX manifest.
    Msi,
    /// Debian package built from a filesystem-hierarchy staging tree.
    Deb,
}

impl PackagingFamily {
    /// Returns the short name for this family.
    pub fn short_name(&self) -> &'static str {
        match self {
            PackagingFamily::Msi => "msi",
            PackagingFamily::Deb => "deb",
        }
    }
}

impl fmt::Display for PackagingFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// CPU architecture of a platform's published binary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Arch {
    /// x86_64 / AMD64 (64-bit)
    X86_64,
    /// x86 / i686 (32-bit)
    X86,
    /// AArch64 / ARM64 (64-bit)
    AArch64,
}

/// A packaging target.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Platform {
    /// Runtime identifier, e.g. `win-x64`. Also the name of the platform's
    /// folder in the build root and in the installer output.
    pub id: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Installer technology.
    pub family: PackagingFamily,
    /// CPU architecture.
    pub arch: Arch,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Every platform the bundler can package.
pub const CATALOG: &[Platform] = &[
    Platform {
        id: "win-x86",
        label: "Windows x32",
        family: PackagingFamily::Msi,
        arch: Arch::X86,
    },
    Platform {
        id: "win-x64",
        label: "Windows x64",
        family: PackagingFamily::Msi,
        arch: Arch::X86_64,
    },
    Platform {
        id: "win-arm64",
        label: "Windows ARM64",
        family: PackagingFamily::Msi,
        arch: Arch::AArch64,
    },
    Platform {
        id: "linux-x64",
        label: "Linux x64",
        family: PackagingFamily::Deb,
        arch: Arch::X86_64,
    },
    Platform {
        id: "linux-arm64",
        label: "Linux ARM64",
        family: PackagingFamily::Deb,
        arch: Arch::AArch64,
    },
];

/// Looks up a platform by identifier.
///
/// # Errors
///
/// [`Error::UnknownPlatform`] if `id` is not in [`CATALOG`].
pub fn resolve(id: &str) -> Result<&'static Platform> {
    CATALOG
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| Error::UnknownPlatform {
            id: id.to_string(),
            known: CATALOG.iter().map(|p| p.id).collect::<Vec<_>>().join(", "),
        })
}

/// Returns the packaging family of a platform identifier.
///
/// ```
/// use kodegen_bundler_installer::bundler::{resolve_family, PackagingFamily};
///
/// assert_eq!(resolve_family("linux-x64").unwrap(), PackagingFamily::Deb);
/// assert!(resolve_family("plan9-mips").is_err());
/// ```
pub fn resolve_family(id: &str) -> Result<PackagingFamily> {
    resolve(id).map(|p| p.family)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_ids_are_msi_and_linux_ids_are_deb() {
        assert_eq!(resolve_family("win-x64").unwrap(), PackagingFamily::Msi);
        assert_eq!(resolve_family("win-x86").unwrap(), PackagingFamily::Msi);
        assert_eq!(resolve_family("linux-x64").unwrap(), PackagingFamily::Deb);
    }

    #[test]
    fn unknown_platform_lists_catalog() {
        let err = resolve_family("osx-x64").unwrap_err();
        match err {
            Error::UnknownPlatform { id, known } => {
                assert_eq!(id, "osx-x64");
                assert!(known.contains("win-x64"));
                assert!(known.contains("linux-x64"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn catalog_ids_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn family_short_names() {
        assert_eq!(PackagingFamily::Msi.to_string(), "msi");
        assert_eq!(PackagingFamily::Deb.to_string(), "deb");
    }
}
