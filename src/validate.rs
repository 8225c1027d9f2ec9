//! Declarative field validation run before saves.

use std::collections::BTreeMap;

use crate::entity::Entity;
use crate::value::Value;

/// When a validator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationContext {
    /// On every save.
    #[default]
    Always,
    /// Only when the entity is transient.
    OnCreate,
    /// Only when the entity is persisted.
    OnUpdate,
}

impl ValidationContext {
    const fn applies(self, is_new: bool) -> bool {
        match self {
            Self::Always => true,
            Self::OnCreate => is_new,
            Self::OnUpdate => !is_new,
        }
    }
}

/// An error message, fixed or computed at report time.
#[derive(Clone, Copy)]
pub enum Message {
    /// A fixed message.
    Static(&'static str),
    /// Computed when the failure is reported.
    Computed(fn() -> String),
}

impl Message {
    fn render(self) -> String {
        match self {
            Self::Static(text) => text.to_string(),
            Self::Computed(f) => f(),
        }
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

enum Rule<E> {
    Required,
    Length { min: usize, max: usize },
    Custom(fn(&E) -> bool),
}

/// One validation rule bound to a field.
///
/// Built with [`Validator::required`], [`Validator::length`] or
/// [`Validator::custom`], then refined with the chainable modifiers.
pub struct Validator<E> {
    field: &'static str,
    rule: Rule<E>,
    message: Option<Message>,
    context: ValidationContext,
}

impl<E: Entity> Validator<E> {
    /// The field must carry a non-empty value. On a persisted entity an
    /// unset field passes, since unset there means "not loaded", not
    /// "absent".
    #[must_use]
    pub const fn required(field: &'static str) -> Self {
        Self { field, rule: Rule::Required, message: None, context: ValidationContext::Always }
    }

    /// A string field's character count must lie within `min..=max`.
    /// Unset fields and non-string values pass.
    #[must_use]
    pub const fn length(field: &'static str, min: usize, max: usize) -> Self {
        Self {
            field,
            rule: Rule::Length { min, max },
            message: None,
            context: ValidationContext::Always,
        }
    }

    /// An arbitrary predicate over the whole entity; failure is reported
    /// against `field`.
    #[must_use]
    pub const fn custom(field: &'static str, check: fn(&E) -> bool) -> Self {
        Self { field, rule: Rule::Custom(check), message: None, context: ValidationContext::Always }
    }

    /// Replaces the default failure message.
    #[must_use]
    pub const fn message(mut self, text: &'static str) -> Self {
        self.message = Some(Message::Static(text));
        self
    }

    /// Replaces the default failure message with one computed at report
    /// time.
    #[must_use]
    pub const fn message_with(mut self, f: fn() -> String) -> Self {
        self.message = Some(Message::Computed(f));
        self
    }

    /// Restricts the validator to transient entities.
    #[must_use]
    pub const fn on_create(mut self) -> Self {
        self.context = ValidationContext::OnCreate;
        self
    }

    /// Restricts the validator to persisted entities.
    #[must_use]
    pub const fn on_update(mut self) -> Self {
        self.context = ValidationContext::OnUpdate;
        self
    }

    fn check(&self, entity: &E) -> bool {
        let value = entity.attribute(self.field).ok().flatten();
        match &self.rule {
            Rule::Required => match value {
                Some(v) => !v.is_empty(),
                None => !entity.is_new(),
            },
            Rule::Length { min, max } => match value {
                Some(Value::Str(s)) => {
                    let len = s.chars().count();
                    len >= *min && len <= *max
                }
                _ => true,
            },
            Rule::Custom(f) => f(entity),
        }
    }

    fn failure_message(&self) -> String {
        self.message.map_or_else(
            || match self.rule {
                Rule::Required => format!("{} is required", self.field),
                Rule::Length { .. } => format!("{} has invalid length", self.field),
                Rule::Custom(_) => format!("{} is invalid", self.field),
            },
            Message::render,
        )
    }
}

/// Accumulated validation failures, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    /// An empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: BTreeMap::new() }
    }

    /// Records a failure against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    /// True when nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The failures recorded against one field.
    #[must_use]
    pub fn field_errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// Every failure message, grouped by field in field order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors.values().flatten().map(String::as_str)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Runs every applicable validator of the entity's metadata, in
/// declaration order.
pub fn validate<E: Entity>(entity: &E) -> ValidationReport {
    let mut report = ValidationReport::new();
    for validator in &E::meta().validators {
        if validator.context.applies(entity.is_new()) && !validator.check(entity) {
            report.add(validator.field, validator.failure_message());
        }
    }
    report
}
