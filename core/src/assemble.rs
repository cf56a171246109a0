use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::hydrate::HydratedRecord;
use crate::traversal::DistanceBuckets;
use crate::value::{cmp_optional, VertexId};

/// Secondary ordering key applied after distance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    /// A scalar property; missing values sort last in either direction.
    Property { name: String, descending: bool },
    Id { descending: bool },
}

impl SortKey {
    pub fn asc(name: impl Into<String>) -> Self {
        SortKey::Property {
            name: name.into(),
            descending: false,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        SortKey::Property {
            name: name.into(),
            descending: true,
        }
    }

    fn compare(&self, a: &OutputRecord, b: &OutputRecord) -> Ordering {
        match self {
            SortKey::Property { name, descending } => {
                let (va, vb) = (a.record.scalar(name), b.record.scalar(name));
                match (va, vb, *descending) {
                    (Some(x), Some(y), true) => y.total_cmp(x),
                    _ => cmp_optional(va, vb),
                }
            }
            SortKey::Id { descending: false } => a.id.cmp(&b.id),
            SortKey::Id { descending: true } => b.id.cmp(&a.id),
        }
    }
}

/// Final output row: a matched vertex, its distance and its attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub id: VertexId,
    pub distance: u32,
    #[serde(flatten)]
    pub record: HydratedRecord,
}

/// Merge distance buckets with hydrated attributes into an ordered list.
///
/// Order: distance ascending, then `order`, then id ascending, so the
/// result is total and repeatable. Every bucketed id appears exactly once;
/// ids missing from `hydrated` get an empty record.
pub fn assemble(
    buckets: &DistanceBuckets,
    hydrated: &BTreeMap<VertexId, HydratedRecord>,
    order: &[SortKey],
) -> Vec<OutputRecord> {
    let mut out: Vec<OutputRecord> = buckets
        .iter()
        .flat_map(|(distance, ids)| ids.iter().map(move |&id| (distance, id)))
        .map(|(distance, id)| OutputRecord {
            id,
            distance,
            record: hydrated
                .get(&id)
                .cloned()
                .unwrap_or_else(|| HydratedRecord::empty(id)),
        })
        .collect();

    out.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then_with(|| {
                order
                    .iter()
                    .map(|key| key.compare(a, b))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    out
}
