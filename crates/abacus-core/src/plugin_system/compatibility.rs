use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::plugin_system::bundle::ModuleBundle;
use crate::plugin_system::dependency::DependencyError;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::version::parse_version;
use crate::storage::schema;

/// How serious a compatibility issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Blocks activation
    Error,
    /// Reported but the plugin can still run
    Warning,
}

impl IssueSeverity {
    pub fn is_critical(&self) -> bool {
        matches!(self, IssueSeverity::Error)
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Error => write!(f, "error"),
            IssueSeverity::Warning => write!(f, "warning"),
        }
    }
}

/// What part of the plugin an issue concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Dependency,
    Api,
    Configuration,
}

impl IssueCategory {
    pub fn description(&self) -> &str {
        match self {
            IssueCategory::Dependency => "Plugin dependency",
            IssueCategory::Api => "Runtime API",
            IssueCategory::Configuration => "Plugin configuration",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCategory::Dependency => write!(f, "dependency"),
            IssueCategory::Api => write!(f, "api"),
            IssueCategory::Configuration => write!(f, "configuration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityIssue {
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub message: String,
    /// Suggested fix
    pub resolution: String,
}

impl CompatibilityIssue {
    pub fn error(category: IssueCategory, message: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            category,
            message: message.into(),
            resolution: resolution.into(),
        }
    }

    pub fn warning(category: IssueCategory, message: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            category,
            message: message.into(),
            resolution: resolution.into(),
        }
    }
}

impl fmt::Display for CompatibilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {} ({})", self.severity, self.category, self.message, self.resolution)
    }
}

/// Outcome of a compatibility check. Compatible means no error-severity issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
    pub plugin_id: String,
    pub issues: Vec<CompatibilityIssue>,
}

impl CompatibilityReport {
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            issues: Vec::new(),
        }
    }

    pub fn is_compatible(&self) -> bool {
        !self.issues.iter().any(|i| i.severity.is_critical())
    }

    pub fn errors(&self) -> impl Iterator<Item = &CompatibilityIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &CompatibilityIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning)
    }

    fn push(&mut self, issue: CompatibilityIssue) {
        self.issues.push(issue);
    }
}

/// Check a loaded bundle against the installed plugins and the runtime API.
///
/// Never fails; every problem becomes an issue in the report.
pub fn check_compatibility(bundle: &ModuleBundle, registry: &PluginRegistry, api_version: &str) -> CompatibilityReport {
    let manifest = bundle.manifest();
    let mut report = CompatibilityReport::new(&manifest.id);

    for dep in &manifest.dependencies {
        let installed = registry.installed_version(&dep.plugin_id);
        match dep.resolve(installed.as_deref()) {
            Ok(()) => {}
            Err(DependencyError::MissingPlugin(dep_id)) if !dep.required => {
                report.push(CompatibilityIssue::warning(
                    IssueCategory::Dependency,
                    format!("Optional dependency '{}' is not installed", dep_id),
                    format!("Install '{}' to enable the features that use it", dep_id),
                ));
            }
            Err(DependencyError::MissingPlugin(dep_id)) => {
                report.push(CompatibilityIssue::error(
                    IssueCategory::Dependency,
                    format!("Required dependency '{}' is not installed", dep_id),
                    format!("Install '{}' before this plugin", dep_id),
                ));
            }
            Err(e @ DependencyError::IncompatibleVersion { .. }) => {
                report.push(CompatibilityIssue::error(
                    IssueCategory::Dependency,
                    e.to_string(),
                    format!("Install a version of '{}' that satisfies the declared range", dep.plugin_id),
                ));
            }
        }
    }

    match parse_version(api_version) {
        Ok(api) if !manifest.compatibility.includes(&api) => {
            report.push(CompatibilityIssue::error(
                IssueCategory::Api,
                format!(
                    "Runtime API {} is outside the supported range '{}'",
                    api_version,
                    manifest.compatibility.constraint_string()
                ),
                "Upgrade the plugin or widen its compatibility range",
            ));
        }
        Ok(_) => {}
        Err(e) => {
            report.push(CompatibilityIssue::error(
                IssueCategory::Api,
                format!("Runtime API version is invalid: {}", e),
                "Report this to the runtime maintainers",
            ));
        }
    }

    let config = &bundle.config;
    if let Some(settings_schema) = &config.settings_schema {
        let mut defaults = settings_schema.defaults();
        for (key, value) in &config.default_settings {
            defaults.insert(key.clone(), value.clone());
        }
        let validation = schema::validate(&Value::Object(defaults), settings_schema);
        for message in validation.error_messages() {
            report.push(CompatibilityIssue::error(
                IssueCategory::Configuration,
                format!("Default settings are invalid: {}", message),
                "Fix the default settings to satisfy the settings schema",
            ));
        }
    }

    for duplicate in config.layout.duplicate_field_ids() {
        report.push(CompatibilityIssue::error(
            IssueCategory::Configuration,
            format!("Field id '{}' is declared more than once", duplicate),
            "Give every field a unique id",
        ));
    }

    for missing in config.undeclared_required_inputs() {
        report.push(CompatibilityIssue::error(
            IssueCategory::Configuration,
            format!("Required input '{}' has no field descriptor", missing),
            "Declare a field for every required input",
        ));
    }

    if bundle.presentation.is_none() {
        report.push(CompatibilityIssue::warning(
            IssueCategory::Configuration,
            "Plugin ships no presentation component",
            "The generic value and interpretation presentation will be used",
        ));
    }

    report
}
