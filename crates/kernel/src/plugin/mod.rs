//! Plugin manifests and runtime handles.
//!
//! This module handles:
//! - Parsing plugin metadata from `.info.toml` files or building it in code
//! - The runtime [`Plugin`] handle with its enabled flag
//!
//! Plugin identity is the `Arc` allocation: two plugins sharing a name are
//! still distinct instances, compared with `Arc::ptr_eq`.

mod handle;
mod info;

pub use handle::Plugin;
pub use info::{CapabilityDecl, PluginInfo};
