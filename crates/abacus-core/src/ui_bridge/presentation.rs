use std::fmt::Write as _;

use serde::Serialize;

use crate::form::engine::RenderedForm;
use crate::plugin_system::bundle::VisualizationDescriptor;
use crate::plugin_system::manifest::PluginManifest;
use crate::plugin_system::traits::{FormattedResult, ScoreResult};
use crate::ui_bridge::error::RenderError;

/// UI message severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSeverity {
    Info,
    Warning,
    Error,
}

/// One element of a rendered UI subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { text: String },
    Text { text: String },
    Form { form: RenderedForm },
    Result {
        headline: String,
        interpretation: Option<String>,
        details: Vec<(String, String)>,
    },
    Band { label: String },
    Notice { severity: MessageSeverity, text: String },
}

/// What a presentation produces for one instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedOutput {
    pub blocks: Vec<Block>,
    /// Set on the panel substituted by a tripped error boundary
    pub is_fallback: bool,
}

impl RenderedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// The result block, if any
    pub fn result(&self) -> Option<(&str, Option<&str>)> {
        self.blocks.iter().find_map(|b| match b {
            Block::Result { headline, interpretation, .. } => {
                Some((headline.as_str(), interpretation.as_deref()))
            }
            _ => None,
        })
    }

    /// Plain-text rendering for terminals and logs
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            // Writing to a String cannot fail
            let _ = match block {
                Block::Heading { text } => writeln!(out, "# {}", text),
                Block::Text { text } => writeln!(out, "{}", text),
                Block::Form { form } => write_form(&mut out, form),
                Block::Result { headline, interpretation, details } => {
                    let _ = writeln!(out, "Result: {}", headline);
                    if let Some(interpretation) = interpretation {
                        let _ = writeln!(out, "  {}", interpretation);
                    }
                    for (key, value) in details {
                        let _ = writeln!(out, "  {}: {}", key, value);
                    }
                    Ok(())
                }
                Block::Band { label } => writeln!(out, "Band: {}", label),
                Block::Notice { severity, text } => writeln!(out, "[{:?}] {}", severity, text),
            };
        }
        out
    }
}

fn write_form(out: &mut String, form: &RenderedForm) -> std::fmt::Result {
    for section in &form.sections {
        if let Some(title) = &section.title {
            let marker = if section.collapsed { "+" } else { "-" };
            writeln!(out, "{} {}", marker, title)?;
        }
        for field in &section.fields {
            let value = field
                .value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string());
            write!(out, "  {}: {}", field.label, value)?;
            if let Some(unit) = &field.unit {
                write!(out, " {}", unit)?;
            }
            if let Some(error) = &field.error {
                write!(out, " (!) {}", error)?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Everything a presentation may read while rendering one instance
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub plugin_id: &'a str,
    pub manifest: &'a PluginManifest,
    pub locale: &'a str,
    pub form: &'a RenderedForm,
    pub score: Option<&'a ScoreResult>,
    pub result: Option<&'a FormattedResult>,
    /// User-facing message of the last failed calculation
    pub error_message: Option<&'a str>,
    pub visualization: Option<&'a VisualizationDescriptor>,
}

/// Turns an instance's state into a UI subtree.
///
/// Render failures, returned or panicked, are contained by the instance's
/// error boundary.
pub trait Presentation: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderedOutput, RenderError>;
}

/// Fallback "value + interpretation" presentation used when a plugin ships none
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericPresentation;

impl Presentation for GenericPresentation {
    fn name(&self) -> &str {
        "generic"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderedOutput, RenderError> {
        let mut output = RenderedOutput::new()
            .push(Block::Heading {
                text: ctx.manifest.name.resolve(ctx.locale).to_string(),
            })
            .push(Block::Form { form: ctx.form.clone() });

        if let Some(message) = ctx.error_message {
            output = output.push(Block::Notice {
                severity: MessageSeverity::Error,
                text: message.to_string(),
            });
        }
        if let Some(result) = ctx.result {
            output = output.push(Block::Result {
                headline: result.headline.clone(),
                interpretation: result.interpretation.clone(),
                details: result.details.clone(),
            });
        }
        let band = ctx
            .visualization
            .zip(ctx.score.and_then(ScoreResult::numeric))
            .and_then(|(vis, score)| vis.band_for(score));
        if let Some(band) = band {
            output = output.push(Block::Band {
                label: band.label.resolve(ctx.locale).to_string(),
            });
        }
        Ok(output)
    }
}
