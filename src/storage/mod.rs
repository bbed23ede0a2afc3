//! Everything punchclock keeps on the disk.
//!  - [backup::JsonBackupStore] holds the running state of every timer and is rewritten on each
//!    tick.
//!  - [registry::ProjectRegistry] holds previously used project name/id pairs.
//!
//!  Both are JSON objects kept in [indexmap::IndexMap], so the key order of the file survives a
//!  load and save.

pub mod backup;
pub mod registry;
