//! Legato Soft Dependencies
//!
//! Track optional dependencies on other plugins without hooking your own
//! startup/shutdown lifecycle. A [`SoftDependency`] watches the host for a
//! plugin matching a declared name; a [`SoftServiceDependency`] watches for
//! a service registration matching a declared capability type. When the
//! dependency becomes available the tracker constructs a usable value via
//! caller-supplied hooks; when it goes away, or the owner itself shuts
//! down, the tracker tears the binding down first, so no dependency logic
//! is left behind.
//!
//! Hook failures are logged and contained: a broken dependency leaves the
//! tracker inactive, never the host's event dispatch.
//!
//! ```
//! use std::sync::Arc;
//!
//! use legato_kernel::{HostConfig, PluginHost, PluginInfo};
//! use legato_softdep::SoftDependency;
//!
//! # fn main() -> anyhow::Result<()> {
//! let host = PluginHost::new(HostConfig::default());
//! let owner = host.register(PluginInfo::new("my-plugin", "1.0.0"))?;
//!
//! let worldedit = SoftDependency::<Arc<String>>::builder(&host, owner.clone(), "worldedit")
//!     .construct(|plugin| Ok(Some(Arc::new(plugin.info().version.clone()))))
//!     .when_enable(|binding| {
//!         println!("hooked into {}", binding.plugin().name());
//!         Ok(())
//!     })
//!     .build();
//!
//! host.enable("my-plugin")?;
//! assert!(!worldedit.is_active());
//!
//! // The tracker activates by itself once "worldedit" comes up.
//! host.register(PluginInfo::new("worldedit", "7.3.0"))?;
//! host.enable("worldedit")?;
//! assert!(worldedit.is_active());
//! assert_eq!(worldedit.get().as_deref().map(String::as_str), Some("7.3.0"));
//! # Ok(())
//! # }
//! ```

mod builder;
mod detect;
mod hooks;
mod service;
mod tracker;

pub use builder::{SoftDependencyBuilder, SoftServiceDependencyBuilder};
pub use detect::{Detect, detect_all};
pub use hooks::{Binding, DependencyHooks, ServiceBinding, ServiceHooks};
pub use service::SoftServiceDependency;
pub use tracker::SoftDependency;
