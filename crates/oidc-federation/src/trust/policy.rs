//! Metadata policy — combining superiors' constraints and applying them.
//!
//! Policies come from every statement on the path except the subject's
//! own configuration and are combined top-down (anchor first):
//!
//! | operator      | combination              | application                      |
//! |---------------|--------------------------|----------------------------------|
//! | `value`       | must agree               | forces the field; `null` removes |
//! | `add`         | union                    | unions into the array            |
//! | `default`     | must agree               | fills an absent field            |
//! | `one_of`      | intersection, non-empty  | field must be one of the set     |
//! | `subset_of`   | intersection, non-empty  | field must be within the set     |
//! | `superset_of` | union                    | field must contain the set       |
//! | `essential`   | logical or               | field must be present            |
//!
//! Unknown operators are rejected. Every violation is a
//! [`FederationError::PolicyConflict`]; nothing is silently overridden.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::entity::EntityType;
use crate::error::{FederationError, Result};

use super::path::TrustPath;

/// Operators constraining one metadata field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOperators {
    pub value: Option<Value>,
    pub add: Option<Vec<Value>>,
    pub default: Option<Value>,
    pub one_of: Option<Vec<Value>>,
    pub subset_of: Option<Vec<Value>>,
    pub superset_of: Option<Vec<Value>>,
    pub essential: Option<bool>,
}

/// Field name → operators.
pub type MetadataPolicy = BTreeMap<String, PolicyOperators>;

fn conflict(field: &str, reason: impl Into<String>) -> FederationError {
    FederationError::PolicyConflict {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn union(a: &[Value], b: &[Value]) -> Vec<Value> {
    let mut out = a.to_vec();
    for v in b {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

fn intersection(a: &[Value], b: &[Value]) -> Vec<Value> {
    a.iter().filter(|v| b.contains(v)).cloned().collect()
}

/// A field value as a list: arrays as-is, scalars as one element.
fn values_of(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn array_operand(field: &str, op: &str, value: &Value) -> Result<Vec<Value>> {
    value
        .as_array()
        .cloned()
        .ok_or_else(|| conflict(field, format!("{op} requires an array")))
}

fn agree(field: &str, op: &str, higher: Option<Value>, lower: Option<Value>) -> Result<Option<Value>> {
    match (higher, lower) {
        (Some(h), Some(l)) if h != l => Err(conflict(
            field,
            format!("{op} {h} set above conflicts with {l} set below"),
        )),
        (h, l) => Ok(h.or(l)),
    }
}

fn narrow(
    field: &str,
    op: &str,
    higher: Option<Vec<Value>>,
    lower: Option<Vec<Value>>,
) -> Result<Option<Vec<Value>>> {
    match (higher, lower) {
        (Some(h), Some(l)) => {
            let both = intersection(&h, &l);
            if both.is_empty() {
                return Err(conflict(field, format!("{op} sets have no common value")));
            }
            Ok(Some(both))
        }
        (h, l) => Ok(h.or(l)),
    }
}

impl PolicyOperators {
    /// Parse the operator object for `field`.
    pub fn parse(field: &str, operators: &Value) -> Result<Self> {
        let operators = operators
            .as_object()
            .ok_or_else(|| conflict(field, "operators must be an object"))?;

        let mut parsed = Self::default();
        for (op, operand) in operators {
            match op.as_str() {
                "value" => parsed.value = Some(operand.clone()),
                "add" => parsed.add = Some(values_of(operand)),
                "default" => parsed.default = Some(operand.clone()),
                "one_of" => parsed.one_of = Some(array_operand(field, op, operand)?),
                "subset_of" => parsed.subset_of = Some(array_operand(field, op, operand)?),
                "superset_of" => parsed.superset_of = Some(array_operand(field, op, operand)?),
                "essential" => {
                    let essential = operand
                        .as_bool()
                        .ok_or_else(|| conflict(field, "essential requires a boolean"))?;
                    parsed.essential = Some(essential);
                }
                unknown => return Err(conflict(field, format!("unknown operator {unknown}"))),
            }
        }
        Ok(parsed)
    }

    /// Combine with the operators of a policy lower in the path.
    pub fn combine(self, lower: Self, field: &str) -> Result<Self> {
        let essential = match (self.essential, lower.essential) {
            (None, None) => None,
            (h, l) => Some(h.unwrap_or(false) || l.unwrap_or(false)),
        };
        let add = match (self.add, lower.add) {
            (Some(h), Some(l)) => Some(union(&h, &l)),
            (h, l) => h.or(l),
        };
        let superset_of = match (self.superset_of, lower.superset_of) {
            (Some(h), Some(l)) => Some(union(&h, &l)),
            (h, l) => h.or(l),
        };

        Ok(Self {
            value: agree(field, "value", self.value, lower.value)?,
            add,
            default: agree(field, "default", self.default, lower.default)?,
            one_of: narrow(field, "one_of", self.one_of, lower.one_of)?,
            subset_of: narrow(field, "subset_of", self.subset_of, lower.subset_of)?,
            superset_of,
            essential,
        })
    }

    /// Check the combined operators do not contradict one another.
    pub fn check_consistency(&self, field: &str) -> Result<()> {
        if let Some(value) = self.value.as_ref().filter(|v| !v.is_null()) {
            if let Some(one_of) = &self.one_of {
                if !one_of.contains(value) {
                    return Err(conflict(field, format!("value {value} is not in one_of")));
                }
            }
            let values = values_of(value);
            if let Some(subset) = &self.subset_of {
                if !values.iter().all(|v| subset.contains(v)) {
                    return Err(conflict(field, format!("value {value} is not within subset_of")));
                }
            }
            if let Some(superset) = &self.superset_of {
                if !superset.iter().all(|v| values.contains(v)) {
                    return Err(conflict(field, format!("value {value} does not cover superset_of")));
                }
            }
        }
        if let (Some(add), Some(subset)) = (&self.add, &self.subset_of) {
            if !add.iter().all(|v| subset.contains(v)) {
                return Err(conflict(field, "add is not within subset_of"));
            }
        }
        Ok(())
    }

    /// Apply to `metadata`, updating `field` in place.
    pub fn apply(&self, field: &str, metadata: &mut Map<String, Value>) -> Result<()> {
        if let Some(value) = &self.value {
            if value.is_null() {
                metadata.remove(field);
                return Ok(());
            }
            if let Some(declared) = metadata.get(field) {
                if declared != value {
                    return Err(conflict(
                        field,
                        format!("declared {declared} differs from required {value}"),
                    ));
                }
            }
            metadata.insert(field.to_string(), value.clone());
        }

        if let Some(add) = &self.add {
            let current = match metadata.get(field) {
                None => Vec::new(),
                Some(Value::Array(items)) => items.clone(),
                Some(other) => {
                    return Err(conflict(field, format!("add requires an array, found {other}")))
                }
            };
            metadata.insert(field.to_string(), Value::Array(union(&current, add)));
        }

        if let Some(default) = &self.default {
            if !metadata.contains_key(field) {
                metadata.insert(field.to_string(), default.clone());
            }
        }

        let Some(current) = metadata.get(field) else {
            if self.essential == Some(true) {
                return Err(conflict(field, "essential field is missing"));
            }
            return Ok(());
        };

        if let Some(one_of) = &self.one_of {
            if current.is_array() || !one_of.contains(current) {
                return Err(conflict(field, format!("{current} is not one of the allowed values")));
            }
        }
        let values = values_of(current);
        if let Some(subset) = &self.subset_of {
            if let Some(extra) = values.iter().find(|v| !subset.contains(v)) {
                return Err(conflict(field, format!("{extra} is not within subset_of")));
            }
        }
        if let Some(superset) = &self.superset_of {
            if let Some(missing) = superset.iter().find(|v| !values.contains(v)) {
                return Err(conflict(field, format!("{missing} required by superset_of is missing")));
            }
        }
        Ok(())
    }
}

/// Parse one statement's policy for a single entity type.
pub fn parse_policy(policy: &Value) -> Result<MetadataPolicy> {
    let fields = policy
        .as_object()
        .ok_or_else(|| conflict("metadata_policy", "policy must be an object"))?;
    fields
        .iter()
        .map(|(field, operators)| Ok((field.clone(), PolicyOperators::parse(field, operators)?)))
        .collect()
}

/// Combine policies given top-down (anchor first) and check the result.
pub fn combine_policies<'a>(policies: impl IntoIterator<Item = &'a Value>) -> Result<MetadataPolicy> {
    let mut combined = MetadataPolicy::new();
    for policy in policies {
        for (field, lower) in parse_policy(policy)? {
            let merged = match combined.remove(&field) {
                Some(higher) => higher.combine(lower, &field)?,
                None => lower,
            };
            combined.insert(field, merged);
        }
    }
    for (field, operators) in &combined {
        operators.check_consistency(field)?;
    }
    Ok(combined)
}

/// Apply a combined policy to declared metadata.
pub fn apply_policy(
    policy: &MetadataPolicy,
    mut metadata: Map<String, Value>,
) -> Result<Map<String, Value>> {
    for (field, operators) in policy {
        operators.apply(field, &mut metadata)?;
    }
    Ok(metadata)
}

/// The subject's metadata for `entity_type`, overlaid field by field with
/// what its immediate superior asserts about it.
pub fn declared_metadata(path: &TrustPath, entity_type: EntityType) -> Map<String, Value> {
    let mut metadata = path
        .subject_configuration()
        .metadata_for(entity_type)
        .cloned()
        .unwrap_or_default();
    if let Some(asserted) = path
        .subordinate_statements()
        .first()
        .and_then(|s| s.metadata_for(entity_type))
    {
        for (field, value) in asserted {
            metadata.insert(field.clone(), value.clone());
        }
    }
    metadata
}

/// Final metadata of the path's subject for `entity_type`.
pub fn apply_metadata_policy(path: &TrustPath, entity_type: EntityType) -> Result<Map<String, Value>> {
    let policies: Vec<&Value> = path.statements()[1..]
        .iter()
        .rev()
        .filter_map(|s| s.metadata_policy_for(entity_type))
        .collect();
    log::debug!(
        "applying {} {entity_type} metadata policies for {}",
        policies.len(),
        path.subject()
    );
    let policy = combine_policies(policies)?;
    apply_policy(&policy, declared_metadata(path, entity_type))
}
