//! Debian package (.deb) support.
//!
//! DEB platforms stage a filesystem-hierarchy tree under `PackageData`:
//!
//! - [`debian`] writes `DEBIAN/control` and the `preinst`/`postinst`
//!   maintainer scripts, then archives the tree into a `.deb`.
//! - [`freedesktop`] writes the `.desktop` launcher entry.
//!
//! # Output Location
//!
//! - `installers/linux-x64/PackageData/` - staged package tree
//! - `installers/linux-x64/sample-app_1.0_all.deb` - package archive
//!
//! The archive is built natively with the `ar`, `tar` and `flate2` crates,
//! so no `dpkg-deb` is needed on the host.

pub mod debian;
pub mod freedesktop;
