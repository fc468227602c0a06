//! Integration tests for the plugin host.
//!
//! ## Test Coverage
//!
//! - Manifest parsing feeding registration (capability declarations resolve)
//! - Registry lookup through `provides` aliases
//! - Lifecycle event ordering around plugin disable
//! - Weight-ordered service lookup across providers
//! - Deferred-activation callbacks across enable/unregister

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use legato_kernel::{HostConfig, HostEvent, PluginHost, PluginInfo};
use parking_lot::Mutex;

fn host() -> PluginHost {
    PluginHost::new(HostConfig::default())
}

#[test]
fn parsed_manifest_registers_and_resolves_capabilities() {
    let toml = r#"
name = "vault"
description = "Economy service bridge"
version = "1.2.0"
provides = ["economy"]

[[capabilities]]
name = "economy/SavingsBank"
parents = ["economy/Bank"]
"#;

    let host = host();
    let info = PluginInfo::parse_str(toml).unwrap();
    let plugin = host.register(info).unwrap();

    assert!(Arc::ptr_eq(&host.plugin("economy").unwrap(), &plugin));
    assert!(host.capabilities().resolves("economy/SavingsBank"));
    assert!(host.capabilities().resolves("economy/Bank"));
    assert!(
        host.capabilities()
            .is_assignable("economy/Bank", "economy/SavingsBank")
    );
}

#[test]
fn disable_event_order_is_observable() {
    let host = host();
    let watcher = host.register(PluginInfo::new("watcher", "1.0.0")).unwrap();
    host.enable("watcher").unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    host.subscribe(&watcher, move |event| {
        let name = match event {
            HostEvent::PluginEnabled(p) => format!("enabled:{}", p.name()),
            HostEvent::PluginDisabling(p) => format!("disabling:{}", p.name()),
            HostEvent::ServiceRegistered(r) => format!("svc+:{}", r.capability()),
            HostEvent::ServiceUnregistered(r) => format!("svc-:{}", r.capability()),
        };
        sink.lock().push(name);
    });

    let provider = host.register(PluginInfo::new("bank", "1.0.0")).unwrap();
    host.enable("bank").unwrap();
    host.register_service(&provider, "economy/Bank", Arc::new(1_u32));
    host.disable("bank").unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            "enabled:bank".to_string(),
            "svc+:economy/Bank".to_string(),
            // The disabling notice arrives while the plugin is still
            // enabled, before its services unwind.
            "disabling:bank".to_string(),
            "svc-:economy/Bank".to_string(),
        ]
    );
}

#[test]
fn weight_ordering_across_providers() {
    let host = host();
    let first = host.register(PluginInfo::new("bank-a", "1.0.0")).unwrap();
    let second = host.register(PluginInfo::new("bank-b", "1.0.0")).unwrap();
    host.enable("bank-a").unwrap();
    host.enable("bank-b").unwrap();

    host.register_service_weighted(&first, "economy/Bank", Arc::new(1_u32), 5);
    let preferred = host.register_service_weighted(&second, "economy/Bank", Arc::new(2_u32), 1);

    let found = host.service_registration("economy/Bank").unwrap();
    assert!(Arc::ptr_eq(&found, &preferred));
    assert_eq!(found.plugin().name(), "bank-b");
}

#[test]
fn bulk_lookup_returns_all_matches_best_first() {
    let host = host();
    let plugin = host.register(PluginInfo::new("bank", "1.0.0")).unwrap();
    host.enable("bank").unwrap();

    let low = host.register_service_weighted(&plugin, "economy/Bank", Arc::new(1_u32), 5);
    let high = host.register_service_weighted(&plugin, "economy/Bank", Arc::new(2_u32), -1);

    let all = host.service_registrations("economy/Bank");
    assert_eq!(all.len(), 2);
    assert!(Arc::ptr_eq(&all[0], &high));
    assert!(Arc::ptr_eq(&all[1], &low));

    assert!(host.service_registrations("never/Declared").is_empty());
}

#[test]
fn equal_weights_keep_registration_order() {
    let host = host();
    let plugin = host.register(PluginInfo::new("bank", "1.0.0")).unwrap();
    host.enable("bank").unwrap();

    let earliest = host.register_service(&plugin, "economy/Bank", Arc::new(1_u32));
    host.register_service(&plugin, "economy/Bank", Arc::new(2_u32));

    let found = host.service_registration("economy/Bank").unwrap();
    assert!(Arc::ptr_eq(&found, &earliest));
}

#[test]
fn deferred_callbacks_run_in_schedule_order() {
    let host = host();
    let plugin = host.register(PluginInfo::new("late", "1.0.0")).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let sink = order.clone();
        host.when_enabled(&plugin, move || {
            sink.lock().push(label);
            Ok(())
        });
    }

    host.enable("late").unwrap();
    assert_eq!(*order.lock(), vec!["first", "second", "third"]);
}

#[test]
fn reregistered_plugin_is_a_fresh_instance() {
    let host = host();
    let original = host.register(PluginInfo::new("bank", "1.0.0")).unwrap();
    host.enable("bank").unwrap();
    host.unregister("bank").unwrap();

    let replacement = host.register(PluginInfo::new("bank", "2.0.0")).unwrap();
    assert!(!Arc::ptr_eq(&original, &replacement));
    assert!(!original.is_enabled());
    assert!(!host.is_enabled("bank"));

    host.enable("bank").unwrap();
    assert!(replacement.is_enabled());
    assert!(!original.is_enabled());
}
