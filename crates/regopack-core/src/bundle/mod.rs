//! OPA bundle archive format.
//!
//! A bundle is a gzip-compressed tar archive. Every entry name starts with a
//! single `/` (`/policy.rego`, `/data.json`) and the optional manifest is the
//! distinguished `/.manifest` entry, written after all source entries.
//!
//! - [`writer`]: create bundles with `BundleWriter`
//! - [`reader`]: inspect bundles with `BundleReader`

pub mod reader;
pub mod writer;

mod tar_read;
mod tar_write;

pub use reader::{BundleEntry, BundleReader};
pub use writer::BundleWriter;
