use std::fmt;

/// Field holding the conversation. Every reflected state must declare it.
pub const MESSAGES: &str = "messages";

/// Field reserved for the loop's step budget. A state must not declare it.
pub const REMAINING_STEPS: &str = "remaining_steps";

/// Declares the field names of a state type.
pub trait StateSchema {
    /// Every field name the state carries.
    fn fields() -> &'static [&'static str];
}

/// A list of declared field (or config key) names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    /// Build a schema from a list of names.
    pub fn new<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The schema a state type declares for itself.
    pub fn of<S: StateSchema>() -> Self {
        Self::new(S::fields().iter().copied())
    }

    /// Whether `field` is declared.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Check that a state schema can be wrapped with a step budget.
    pub fn validate_for_reflection(&self) -> Result<(), SchemaError> {
        if self.contains(REMAINING_STEPS) {
            return Err(SchemaError::ShadowedField(REMAINING_STEPS));
        }
        if !self.contains(MESSAGES) {
            return Err(SchemaError::MissingField(MESSAGES));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema declares a field the loop reserves for itself.
    ShadowedField(&'static str),
    /// The schema lacks a field the loop requires.
    MissingField(&'static str),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShadowedField(name) => {
                write!(f, "state schema has key '{name}', this shadows a built in key")
            }
            Self::MissingField(name) => write!(f, "missing required key '{name}' in state schema"),
        }
    }
}

impl std::error::Error for SchemaError {}
