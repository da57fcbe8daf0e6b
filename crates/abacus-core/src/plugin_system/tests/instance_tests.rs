use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::event::hub::EventHub;
use crate::event::types::RuntimeEvent;
use crate::execution::error::{ComputationFailure, ExecutionError};
use crate::kernel::error::Error;
use crate::plugin_system::instance::{HostCallbacks, InstanceHandle, InstanceOptions};
use crate::plugin_system::loader::ModuleLoader;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::source::StaticPluginSource;
use crate::plugin_system::tests::fixtures::{
    bmi_config_with_id, bmi_source, conditional_config, drain, BmiScoring, BrokenPresentation,
    RecordingScoring,
};
use crate::ui_bridge::root::ContainerId;

async fn create(
    sources: Vec<StaticPluginSource>,
    id: &str,
    container: &str,
    options: InstanceOptions,
) -> (ModuleLoader, InstanceHandle) {
    let registry = Arc::new(PluginRegistry::new());
    for source in sources {
        registry.register(Arc::new(source)).unwrap();
    }
    let loader = ModuleLoader::new(registry, EventHub::new(64));
    let handle = loader
        .create_instance(id, ContainerId::new(container), options)
        .await
        .unwrap();
    (loader, handle)
}

#[tokio::test]
async fn test_new_instance_renders_defaults() {
    let (_loader, handle) = create(vec![bmi_source()], "bmi", "panel", InstanceOptions::default()).await;
    let text = handle.output_text().await.unwrap();
    assert!(text.contains("# Body Mass Index"));
    assert!(text.contains("Weight: 80 kg"));
    assert!(!text.contains("Result:"));
}

#[tokio::test]
async fn test_calculate_success_calls_back() {
    let results = Arc::new(Mutex::new(Vec::new()));
    let sink = results.clone();
    let callbacks = HostCallbacks::new().on_calculate(move |r| sink.lock().unwrap().push(r.value.clone()));
    let options = InstanceOptions::default()
        .with_callbacks(callbacks)
        .with_input("height", json!(200));
    let (_loader, handle) = create(vec![bmi_source()], "bmi", "panel", options).await;

    assert!(handle.set_input("weight", json!(100)).await);
    let result = handle.calculate().await.unwrap();
    assert_eq!(result.numeric(), Some(25.0));
    assert_eq!(result.interpretation.as_deref(), Some("Overweight"));
    assert_eq!(*results.lock().unwrap(), vec![json!(25.0)]);

    let instance = handle.lock().await;
    assert_eq!(instance.last_result(), Some(&result));
    assert_eq!(instance.formatted_result().unwrap().headline, "25.0 kg/m²");
    assert!(instance.last_error().is_none());
    let text = instance.output().unwrap().to_text();
    assert!(text.contains("Result: 25.0 kg/m²"));
    assert!(text.contains("Overweight"));
}

#[tokio::test]
async fn test_failed_compute_keeps_previous_result() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    let callbacks = HostCallbacks::new().on_error(move |e: &Error| sink.lock().unwrap().push(e.to_string()));
    let (loader, handle) = create(
        vec![bmi_source()],
        "bmi",
        "panel",
        InstanceOptions::default().with_callbacks(callbacks),
    )
    .await;
    let mut rx = loader.hub().subscribe();

    let first = handle.calculate().await.unwrap();
    assert_eq!(first.numeric(), Some(20.0));

    handle.set_input("height", json!(0)).await;
    let err = handle.calculate().await.unwrap_err();
    assert_eq!(
        err,
        ExecutionError::computation(ComputationFailure::Failed, "height must be greater than zero")
    );

    let instance = handle.lock().await;
    assert_eq!(instance.last_result(), Some(&first));
    assert_eq!(instance.last_error(), Some(&err));
    let text = instance.output().unwrap().to_text();
    assert!(text.contains("The calculation could not be completed"));
    assert!(!text.contains("greater than zero"));
    assert!(text.contains("Result: 20.0 kg/m²"));

    assert_eq!(errors.lock().unwrap().len(), 1);
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [RuntimeEvent::CalculationFailed { message, .. }] if message.contains("greater than zero")
    ));
}

#[tokio::test]
async fn test_form_errors_block_compute() {
    let calculated = Arc::new(Mutex::new(0));
    let sink = calculated.clone();
    let callbacks = HostCallbacks::new().on_calculate(move |_| *sink.lock().unwrap() += 1);
    let (_loader, handle) = create(
        vec![bmi_source()],
        "bmi",
        "panel",
        InstanceOptions::default().with_callbacks(callbacks),
    )
    .await;

    handle.set_input("weight", json!(900)).await;
    handle.set_input("height", json!(null)).await;
    let err = handle.calculate().await.unwrap_err();

    let fields = err.field_errors().unwrap();
    assert_eq!(fields.get("weight").map(String::as_str), Some("Weight must be between 1 and 500"));
    assert_eq!(fields.get("height").map(String::as_str), Some("Height is required"));
    assert_eq!(*calculated.lock().unwrap(), 0);

    // calculate touches every visible field, so the errors are shown
    let text = handle.output_text().await.unwrap();
    assert!(text.contains("(!) Height is required"));
}

#[tokio::test]
async fn test_hidden_fields_never_reach_compute() {
    let scoring = RecordingScoring::default();
    let seen = scoring.seen.clone();
    let source = StaticPluginSource::new(conditional_config(), scoring);
    let (_loader, handle) = create(vec![source], "conditional", "panel", InstanceOptions::default()).await;

    handle.set_input("bonus", json!(10)).await;
    assert_eq!(handle.calculate().await.unwrap().numeric(), Some(1.0));

    handle.set_input("mode", json!("full")).await;
    assert_eq!(handle.calculate().await.unwrap().numeric(), Some(11.0));

    let seen = seen.lock().unwrap();
    assert!(!seen[0].contains_key("bonus"));
    assert_eq!(seen[1].get("bonus"), Some(&json!(10)));
}

#[tokio::test]
async fn test_unknown_input_is_rejected() {
    let (_loader, handle) = create(vec![bmi_source()], "bmi", "panel", InstanceOptions::default()).await;
    assert!(!handle.set_input("age", json!(40)).await);
    assert!(!handle.lock().await.inputs().contains_key("age"));
}

#[tokio::test]
async fn test_section_toggle_rerenders() {
    let source = StaticPluginSource::new(conditional_config(), RecordingScoring::default());
    let (_loader, handle) = create(vec![source], "conditional", "panel", InstanceOptions::default()).await;
    let mut instance = handle.lock().await;
    assert_eq!(instance.toggle_section("main"), Some(true));
    assert!(instance.output().unwrap().to_text().contains("+ Main"));
    assert_eq!(instance.toggle_section("nope"), None);
}

#[tokio::test]
async fn test_broken_presentation_is_isolated() {
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = reported.clone();
    let callbacks = HostCallbacks::new().on_error(move |e: &Error| sink.lock().unwrap().push(e.to_string()));
    let broken = StaticPluginSource::new(bmi_config_with_id("broken"), BmiScoring)
        .with_presentation(Arc::new(BrokenPresentation));

    let registry = Arc::new(PluginRegistry::new());
    registry.register(Arc::new(broken)).unwrap();
    registry.register(Arc::new(bmi_source())).unwrap();
    let loader = ModuleLoader::new(registry, EventHub::new(64));
    let mut rx = loader.hub().subscribe();

    let bad = loader
        .create_instance(
            "broken",
            ContainerId::new("left"),
            InstanceOptions::default().with_callbacks(callbacks),
        )
        .await
        .unwrap();
    let good = loader
        .create_instance("bmi", ContainerId::new("right"), InstanceOptions::default())
        .await
        .unwrap();

    {
        let mut instance = bad.lock().await;
        assert!(instance.is_boundary_tripped());
        assert!(instance.output().unwrap().is_fallback);
        // Still usable: calculations run, the panel stays in fallback
        instance.calculate().await.unwrap();
        assert!(instance.output().unwrap().is_fallback);
    }
    assert_eq!(reported.lock().unwrap().len(), 1);
    assert!(reported.lock().unwrap()[0].contains("chart data missing"));

    let good = good.lock().await;
    assert!(!good.is_boundary_tripped());
    assert!(!good.output().unwrap().is_fallback);

    let tripped: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, RuntimeEvent::BoundaryTripped { .. }))
        .collect();
    assert_eq!(tripped.len(), 1);
    assert_eq!(tripped[0].plugin_id(), "broken");
}
