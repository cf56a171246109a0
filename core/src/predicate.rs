use std::collections::BTreeSet;

use crate::error::{EngineError, EngineResult};
use crate::value::{PropertyBundle, Value};

/// Filter over vertex properties, applied to candidate matches only.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    /// Every vertex matches.
    #[default]
    Any,
    /// `property == value` (a multi-valued property matches if any element does).
    Equals { property: String, value: Value },
    /// `property` equals one of `values`.
    OneOf { property: String, values: Vec<Value> },
    /// All inner predicates match.
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Equals {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn is_any(&self) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::And(inner) => inner.iter().all(Predicate::is_any),
            _ => false,
        }
    }

    /// Reject empty property names and empty `OneOf` sets.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            Predicate::Any => Ok(()),
            Predicate::Equals { property, .. } => check_property(property),
            Predicate::OneOf { property, values } => {
                check_property(property)?;
                if values.is_empty() {
                    return Err(EngineError::invalid(format!(
                        "predicate on '{}' has an empty value set",
                        property
                    )));
                }
                Ok(())
            }
            Predicate::And(inner) => inner.iter().try_for_each(Predicate::validate),
        }
    }

    /// Property names the predicate reads, sorted and deduplicated.
    pub fn property_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names.into_iter().collect()
    }

    fn collect_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Predicate::Any => {}
            Predicate::Equals { property, .. } | Predicate::OneOf { property, .. } => {
                names.insert(property.clone());
            }
            Predicate::And(inner) => inner.iter().for_each(|p| p.collect_names(names)),
        }
    }

    /// Evaluate against a property bundle. A missing property never matches.
    pub fn matches(&self, props: &PropertyBundle) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Equals { property, value } => {
                props.get(property).is_some_and(|v| v.matches(value))
            }
            Predicate::OneOf { property, values } => props
                .get(property)
                .is_some_and(|v| values.iter().any(|expected| v.matches(expected))),
            Predicate::And(inner) => inner.iter().all(|p| p.matches(props)),
        }
    }
}

fn check_property(property: &str) -> EngineResult<()> {
    if property.trim().is_empty() {
        return Err(EngineError::invalid("predicate property name is empty"));
    }
    Ok(())
}
