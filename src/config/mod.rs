//! Config Store & descriptor parsing (§4.7, §6, §9.3).

pub mod descriptor;
pub mod store;

pub use descriptor::{AttachmentSpec, ConvertorSpec, Descriptor, ServiceConfig, UrlMapping};
pub use store::{ConfigSnapshot, ConfigStore};
