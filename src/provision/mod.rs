//! Storage provisioning components, each wrapping one layer of the stack:
//! raw device, partition table, LUKS container, LVM, filesystems,
//! mounts, and the configuration the installed system boots with.
//!
//! Components never call each other. The installer in [`crate::apply`]
//! strings them together and records what they did.

pub mod device;
pub mod encryption;
pub mod filesystem;
pub mod mount;
pub mod partition;
pub mod persist;
pub mod volume;
