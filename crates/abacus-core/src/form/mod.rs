//! # Dynamic Form Engine
//!
//! Declarative [`FieldDescriptor`]s, optionally grouped into
//! [`SectionDescriptor`]s, rendered against the current values. Fields and
//! sections carry visibility [`Condition`]s; hidden fields are excluded
//! from rendering, validation and the inputs handed to the calculator.
pub mod condition;
pub mod descriptor;
pub mod engine;

pub use condition::{evaluate_condition, is_satisfied};
pub use descriptor::{
    ChoiceOption, Condition, ConditionOperator, FieldDescriptor, FieldType, FormLayout,
    RendererKind, SectionDescriptor, ValidationRule,
};
pub use engine::{FormEngine, RenderedField, RenderedForm, RenderedOption, RenderedSection};

#[cfg(test)]
mod tests;
