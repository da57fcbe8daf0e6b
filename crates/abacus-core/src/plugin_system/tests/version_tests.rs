use crate::plugin_system::dependency::{DependencyError, PluginDependency};
use crate::plugin_system::version::{parse_version, VersionError, VersionRange};

#[test]
fn test_range_matching() {
    let range = VersionRange::from_constraint("^1.2").unwrap();
    assert!(range.includes_str("1.2.0"));
    assert!(range.includes_str("1.9.3"));
    assert!(!range.includes_str("2.0.0"));
    assert!(!range.includes_str("not-a-version"));
    assert_eq!(range.to_string(), "^1.2");
}

#[test]
fn test_any_range_accepts_everything() {
    let range = VersionRange::any();
    assert!(range.includes_str("0.0.1"));
    assert!(range.includes_str("42.0.0"));
    assert_eq!(range.constraint_string(), "*");
}

#[test]
fn test_invalid_inputs() {
    assert!(matches!(
        VersionRange::from_constraint("one point oh"),
        Err(VersionError::InvalidConstraint { .. })
    ));
    assert!(matches!(parse_version("1.x"), Err(VersionError::InvalidVersion { .. })));
    assert_eq!(parse_version(" 1.2.3 ").unwrap().minor, 2);
}

#[test]
fn test_range_serde_uses_constraint_string() {
    let range: VersionRange = serde_json::from_str("\">=1.0, <2.0\"").unwrap();
    assert!(range.includes_str("1.5.0"));
    assert_eq!(serde_json::to_string(&range).unwrap(), "\">=1.0, <2.0\"");
    assert!(serde_json::from_str::<VersionRange>("\"nope\"").is_err());
}

#[test]
fn test_dependency_resolution() {
    let dep = PluginDependency::required("units", VersionRange::from_constraint("^2").unwrap());
    assert_eq!(dep.resolve(Some("2.4.0")), Ok(()));
    assert_eq!(dep.resolve(None), Err(DependencyError::MissingPlugin("units".to_string())));
    assert!(matches!(
        dep.resolve(Some("1.0.0")),
        Err(DependencyError::IncompatibleVersion { ref actual_version, .. }) if actual_version == "1.0.0"
    ));
    assert!(PluginDependency::required_any("units").is_compatible_with("0.1.0"));
}

#[test]
fn test_dependency_display() {
    let optional = PluginDependency::optional("charts", VersionRange::from_constraint("~1.1").unwrap());
    assert_eq!(optional.to_string(), "Optional plugin: charts (version: ~1.1)");
    assert_eq!(
        PluginDependency::required_any("units").to_string(),
        "Requires plugin: units (any version)"
    );
}

#[test]
fn test_dependency_deserialize_defaults_to_required() {
    let dep: PluginDependency = serde_json::from_str(r#"{ "plugin_id": "units" }"#).unwrap();
    assert!(dep.required);
    assert!(dep.version_range.is_none());
}
