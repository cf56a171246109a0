//! Category-batched attribute hydration.
//!
//! Each [`AttributeSpec`] is resolved with exactly one port round trip for
//! the whole id set, then joined back per id. The number of store calls is
//! `categories.len()`, independent of how many vertices matched.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::port::{EdgeWalk, GraphPort, OnwardStep, TraversalDirection};
use crate::value::{cmp_optional, PropertyBundle, Value, VertexId};

/// One attribute category to resolve for every matched vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSpec {
    /// Scalar properties of the vertex itself. Empty = all properties.
    Scalars { properties: Vec<String> },
    /// A property of the vertex reached over a single-valued outgoing edge
    /// (e.g. `isLocatedIn` -> city `name`).
    Single {
        key: String,
        edge_label: String,
        property: String,
    },
    /// Every vertex reached over a repeated outgoing edge, with one property
    /// of it, one property of the edge, and optionally one property of the
    /// vertex one `onward` edge further (e.g. `studyAt` -> university name,
    /// `classYear`, university city name).
    Repeated {
        key: String,
        edge_label: String,
        edge_property: Option<String>,
        target_property: String,
        onward: Option<OnwardStep>,
    },
}

impl AttributeSpec {
    pub fn scalars<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeSpec::Scalars {
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(
        key: impl Into<String>,
        edge_label: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        AttributeSpec::Single {
            key: key.into(),
            edge_label: edge_label.into(),
            property: property.into(),
        }
    }

    pub fn repeated(
        key: impl Into<String>,
        edge_label: impl Into<String>,
        target_property: impl Into<String>,
    ) -> Self {
        AttributeSpec::Repeated {
            key: key.into(),
            edge_label: edge_label.into(),
            edge_property: None,
            target_property: target_property.into(),
            onward: None,
        }
    }

    /// Read this edge property for each entry of a `Repeated` category.
    /// No effect on other variants.
    pub fn with_edge_property(mut self, name: impl Into<String>) -> Self {
        if let AttributeSpec::Repeated { edge_property, .. } = &mut self {
            *edge_property = Some(name.into());
        }
        self
    }

    /// Follow one more outgoing edge for each entry of a `Repeated` category.
    /// No effect on other variants.
    pub fn with_onward(mut self, edge_label: impl Into<String>, property: impl Into<String>) -> Self {
        if let AttributeSpec::Repeated { onward, .. } = &mut self {
            *onward = Some(OnwardStep {
                edge_label: edge_label.into(),
                property: property.into(),
            });
        }
        self
    }

    fn key(&self) -> Option<&str> {
        match self {
            AttributeSpec::Scalars { .. } => None,
            AttributeSpec::Single { key, .. } | AttributeSpec::Repeated { key, .. } => Some(key),
        }
    }
}

/// One related vertex in a repeated category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedEntry {
    pub target: VertexId,
    pub value: Option<Value>,
    pub edge_value: Option<Value>,
    pub onward_value: Option<Value>,
}

/// A matched vertex with every requested category resolved.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HydratedRecord {
    /// Not serialized: records are keyed by id wherever they are emitted.
    #[serde(skip_serializing)]
    pub id: VertexId,
    pub scalars: PropertyBundle,
    pub single: BTreeMap<String, Option<Value>>,
    pub repeated: BTreeMap<String, Vec<RelatedEntry>>,
}

impl HydratedRecord {
    /// A record with no data, used for ids nothing was found for.
    pub fn empty(id: VertexId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn scalar(&self, name: &str) -> Option<&Value> {
        self.scalars.get(name)
    }

    /// Value of a single-valued category; `None` if absent.
    pub fn single_value(&self, key: &str) -> Option<&Value> {
        self.single.get(key).and_then(|v| v.as_ref())
    }

    /// Entries of a repeated category; empty if none.
    pub fn entries(&self, key: &str) -> &[RelatedEntry] {
        self.repeated.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Resolve `categories` for every id in `ids`.
///
/// Every requested id gets a record, and every category key appears in every
/// record: `None` for a missing single value, an empty list for a repeated
/// category without edges. An empty id set returns an empty map without
/// calling the store.
pub fn hydrate<P: GraphPort + ?Sized>(
    port: &P,
    ids: &[VertexId],
    categories: &[AttributeSpec],
) -> EngineResult<BTreeMap<VertexId, HydratedRecord>> {
    validate_categories(categories)?;

    let unique: Vec<VertexId> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let mut records: BTreeMap<VertexId, HydratedRecord> = unique
        .iter()
        .map(|&id| (id, HydratedRecord::empty(id)))
        .collect();
    if unique.is_empty() {
        return Ok(records);
    }

    for spec in categories {
        match spec {
            AttributeSpec::Scalars { properties } => {
                let bundles = port.properties(&unique, properties)?;
                debug!(ids = unique.len(), found = bundles.len(), "hydrated scalars");
                for (id, bundle) in bundles {
                    if let Some(record) = records.get_mut(&id) {
                        record.scalars.extend(bundle);
                    }
                }
            }
            AttributeSpec::Single {
                key,
                edge_label,
                property,
            } => {
                let walk = EdgeWalk::new(edge_label.as_str()).target_property(property.as_str());
                let rows = port.walk(&unique, &walk)?;
                debug!(key = %key, rows = rows.len(), "hydrated single-valued category");

                // Lowest target id wins when the edge is not actually single-valued.
                let mut best: BTreeMap<VertexId, (VertexId, Option<Value>)> = BTreeMap::new();
                for row in rows {
                    let slot = best.entry(row.source).or_insert((row.target, None));
                    if row.target <= slot.0 {
                        *slot = (row.target, row.target_value);
                    }
                }
                for record in records.values_mut() {
                    let value = best.remove(&record.id).and_then(|(_, v)| v);
                    record.single.insert(key.clone(), value);
                }
            }
            AttributeSpec::Repeated {
                key,
                edge_label,
                edge_property,
                target_property,
                onward,
            } => {
                let walk = EdgeWalk {
                    edge_label: edge_label.clone(),
                    direction: TraversalDirection::Outgoing,
                    edge_property: edge_property.clone(),
                    target_property: Some(target_property.clone()),
                    onward: onward.clone(),
                };
                let rows = port.walk(&unique, &walk)?;
                debug!(key = %key, rows = rows.len(), "hydrated repeated category");

                for record in records.values_mut() {
                    record.repeated.insert(key.clone(), Vec::new());
                }
                for row in rows {
                    if let Some(list) = records
                        .get_mut(&row.source)
                        .and_then(|r| r.repeated.get_mut(key))
                    {
                        list.push(RelatedEntry {
                            target: row.target,
                            value: row.target_value,
                            edge_value: row.edge_value,
                            onward_value: row.onward_value,
                        });
                    }
                }
                for record in records.values_mut() {
                    if let Some(list) = record.repeated.get_mut(key) {
                        list.sort_by(|a, b| {
                            a.target
                                .cmp(&b.target)
                                .then_with(|| cmp_optional(a.edge_value.as_ref(), b.edge_value.as_ref()))
                        });
                    }
                }
            }
        }
    }

    Ok(records)
}

fn validate_categories(categories: &[AttributeSpec]) -> EngineResult<()> {
    let mut keys: HashSet<&str> = HashSet::new();
    for spec in categories {
        if let Some(key) = spec.key() {
            if key.is_empty() {
                return Err(EngineError::invalid("attribute category key is empty"));
            }
            if !keys.insert(key) {
                return Err(EngineError::invalid(format!(
                    "duplicate attribute category '{}'",
                    key
                )));
            }
        }
        let edge_label = match spec {
            AttributeSpec::Scalars { .. } => continue,
            AttributeSpec::Single { edge_label, .. } | AttributeSpec::Repeated { edge_label, .. } => {
                edge_label
            }
        };
        if edge_label.is_empty() {
            return Err(EngineError::invalid("attribute category edge label is empty"));
        }
    }
    Ok(())
}
