use std::sync::Arc;

use tokio::sync::Notify;

use crate::event::hub::EventHub;
use crate::event::types::RuntimeEvent;
use crate::kernel::component::KernelComponent;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::instance::InstanceOptions;
use crate::plugin_system::loader::ModuleLoader;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::source::StaticPluginSource;
use crate::plugin_system::tests::fixtures::{
    bmi_config, bmi_config_with_id, bmi_source, drain, BmiScoring, GatedSource,
};
use crate::ui_bridge::root::ContainerId;

fn loader_with(sources: Vec<StaticPluginSource>) -> ModuleLoader {
    let registry = Arc::new(PluginRegistry::new());
    for source in sources {
        registry.register(Arc::new(source)).unwrap();
    }
    ModuleLoader::new(registry, EventHub::new(64))
}

#[tokio::test]
async fn test_unknown_id_fails_without_caching() {
    let loader = loader_with(vec![]);
    let mut rx = loader.hub().subscribe();

    let err = loader.load_module("nope").await.unwrap_err();
    assert!(matches!(err, PluginSystemError::ModuleUnavailable { ref plugin_id, .. } if plugin_id == "nope"));
    assert!(!loader.is_cached("nope"));
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [RuntimeEvent::ModuleLoadFailed { plugin_id, .. }] if plugin_id == "nope"
    ));
}

#[tokio::test]
async fn test_missing_artifacts_are_unavailable() {
    let no_scoring = StaticPluginSource::empty("partial").with_config(bmi_config_with_id("partial"));
    let no_config = StaticPluginSource::empty("hollow").with_scoring(Arc::new(BmiScoring));
    let loader = loader_with(vec![no_scoring, no_config]);

    let err = loader.load_module("partial").await.unwrap_err();
    assert!(err.to_string().contains("scoring implementation is missing"));
    let err = loader.load_module("hollow").await.unwrap_err();
    assert!(err.to_string().contains("config descriptor is missing"));
    assert!(loader.cached_ids().is_empty());
}

#[tokio::test]
async fn test_descriptor_id_must_match() {
    let alias = StaticPluginSource::empty("alias")
        .with_config(bmi_config())
        .with_scoring(Arc::new(BmiScoring));
    let loader = loader_with(vec![alias]);
    let err = loader.load_module("alias").await.unwrap_err();
    assert!(err.to_string().contains("declares id 'bmi'"));
    assert!(!loader.is_cached("alias"));
}

#[tokio::test]
async fn test_second_load_hits_cache() {
    let loader = loader_with(vec![bmi_source()]);
    let first = loader.load_module("bmi").await.unwrap();
    let second = loader.load_module("bmi").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.cached_ids(), vec!["bmi".to_string()]);

    assert!(loader.evict_module("bmi"));
    let third = loader.load_module("bmi").await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[tokio::test]
async fn test_concurrent_creation_in_same_container_is_busy() {
    let entered = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let registry = Arc::new(PluginRegistry::new());
    registry
        .register(Arc::new(GatedSource {
            inner: bmi_source(),
            entered: entered.clone(),
            gate: gate.clone(),
        }))
        .unwrap();
    registry
        .register(Arc::new(StaticPluginSource::new(bmi_config_with_id("other"), BmiScoring)))
        .unwrap();
    let loader = Arc::new(ModuleLoader::new(registry, EventHub::new(64)));

    let first = {
        let loader = loader.clone();
        tokio::spawn(async move {
            loader
                .create_instance("bmi", ContainerId::new("panel"), InstanceOptions::default())
                .await
        })
    };
    entered.notified().await;

    let err = loader
        .create_instance("bmi", ContainerId::new("panel"), InstanceOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_busy());

    // Other containers are not blocked
    let other = loader
        .create_instance("other", ContainerId::new("side"), InstanceOptions::default())
        .await
        .unwrap();
    assert_eq!(other.plugin_id(), "other");

    gate.notify_one();
    let handle = first.await.unwrap().unwrap();
    assert_eq!(handle.container().as_str(), "panel");
    // A failing visualization does not fail the load
    assert!(loader.cached_module("bmi").unwrap().visualization.is_none());

    // The guard is released once creation finishes
    let again = loader
        .create_instance("bmi", ContainerId::new("panel"), InstanceOptions::default())
        .await;
    assert!(again.is_ok());
}

#[tokio::test]
async fn test_failed_creation_releases_container() {
    let loader = loader_with(vec![bmi_source()]);
    assert!(loader
        .create_instance("missing", ContainerId::new("panel"), InstanceOptions::default())
        .await
        .is_err());
    assert!(loader
        .create_instance("bmi", ContainerId::new("panel"), InstanceOptions::default())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_destroy_then_create_elsewhere() {
    let loader = loader_with(vec![bmi_source()]);
    let mut rx = loader.hub().subscribe();

    let a = loader
        .create_instance("bmi", ContainerId::new("a"), InstanceOptions::default())
        .await
        .unwrap();
    assert!(a.is_live());
    assert!(loader.destroy_instance(&ContainerId::new("a")).await);
    assert!(!a.is_live());
    assert!(!a.lock().await.is_mounted());
    assert!(!loader.destroy_instance(&ContainerId::new("a")).await);
    // The module stays cached after its last instance is gone
    assert!(loader.is_cached("bmi"));

    let b = loader
        .create_instance("bmi", ContainerId::new("b"), InstanceOptions::default())
        .await
        .unwrap();
    assert!(b.is_live());
    assert_eq!(loader.containers(), vec![ContainerId::new("b")]);

    let names: Vec<&str> = drain(&mut rx).iter().map(RuntimeEvent::name).collect();
    assert_eq!(
        names,
        vec!["module_loaded", "instance_created", "instance_destroyed", "instance_created"]
    );
}

#[tokio::test]
async fn test_create_replaces_instance_in_same_container() {
    let loader = loader_with(vec![bmi_source()]);
    let first = loader
        .create_instance("bmi", ContainerId::new("panel"), InstanceOptions::default())
        .await
        .unwrap();
    let second = loader
        .create_instance("bmi", ContainerId::new("panel"), InstanceOptions::default())
        .await
        .unwrap();

    assert!(!first.is_live());
    assert!(second.is_live());
    assert!(!first.lock().await.is_mounted());
    assert_eq!(loader.instance_count(), 1);
    // A stale handle cannot destroy its successor
    assert!(!first.destroy().await);
    assert!(second.is_live());
}

#[tokio::test]
async fn test_destroy_instances_of_plugin() {
    let loader = loader_with(vec![
        bmi_source(),
        StaticPluginSource::new(bmi_config_with_id("other"), BmiScoring),
    ]);
    for container in ["a", "b"] {
        loader
            .create_instance("bmi", ContainerId::new(container), InstanceOptions::default())
            .await
            .unwrap();
    }
    loader
        .create_instance("other", ContainerId::new("c"), InstanceOptions::default())
        .await
        .unwrap();

    assert_eq!(loader.destroy_instances_of("bmi").await, 2);
    assert_eq!(loader.containers(), vec![ContainerId::new("c")]);
}

#[tokio::test]
async fn test_stop_unmounts_everything() {
    let loader = loader_with(vec![bmi_source()]);
    let handle = loader
        .create_instance("bmi", ContainerId::new("a"), InstanceOptions::default())
        .await
        .unwrap();
    loader.stop().await.unwrap();
    assert_eq!(loader.instance_count(), 0);
    assert!(!handle.lock().await.is_mounted());
}
