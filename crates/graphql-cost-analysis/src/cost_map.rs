use std::collections::{btree_map, BTreeMap};

use crate::coordinate::{DirectiveUsage, SchemaCoordinate};

/// Everything the type system says about the cost of one schema coordinate.
///
/// Fields are filled incrementally while the extractor visits the annotations applied on the
/// coordinate, so most entries only carry one or two of them.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostEntry {
    /// Decimal weight from `@cost(weight:)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assumed_size: Option<u64>,
    /// Arguments on this field that bound the size of the returned list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slicing_arguments: Option<Vec<String>>,
    /// Fields on the child selection that the size applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sized_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_one_slicing_argument: Option<bool>,
    /// Named input type of a field argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument_type: Option<String>,
    /// Default value literal of a slicing argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directives: Option<BTreeMap<DirectiveUsage, u64>>,
}

impl CostEntry {
    /// The parsed weight. Weights are validated during extraction, so a value that does not parse
    /// can only come from a hand-built map and is ignored.
    pub fn weight(&self) -> Option<f64> {
        self.weight.as_deref().and_then(|weight| weight.trim().parse().ok())
    }

    pub fn has_list_size(&self) -> bool {
        self.assumed_size.is_some() || self.slicing_arguments.is_some() || self.sized_fields.is_some()
    }
}

/// Cost entries of a whole schema generation, keyed by schema coordinate.
///
/// The map is built once and never mutated while operations are analyzed against it.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CostMap {
    entries: BTreeMap<SchemaCoordinate, CostEntry>,
}

impl CostMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coordinate: &SchemaCoordinate) -> Option<&CostEntry> {
        self.entries.get(coordinate)
    }

    pub fn contains(&self, coordinate: &SchemaCoordinate) -> bool {
        self.entries.contains_key(coordinate)
    }

    pub fn insert(&mut self, coordinate: SchemaCoordinate, entry: CostEntry) -> Option<CostEntry> {
        self.entries.insert(coordinate, entry)
    }

    /// The entry for a coordinate, created empty if it does not exist yet.
    pub(crate) fn entry_mut(&mut self, coordinate: SchemaCoordinate) -> &mut CostEntry {
        self.entries.entry(coordinate).or_default()
    }

    pub fn weight(&self, coordinate: &SchemaCoordinate) -> Option<f64> {
        self.get(coordinate).and_then(CostEntry::weight)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, SchemaCoordinate, CostEntry> {
        self.entries.iter()
    }

    /// Union of both maps. Entries of `other` replace entries with the same coordinate.
    pub fn merge(&mut self, other: CostMap) {
        for (coordinate, entry) in other.entries {
            if let Some(previous) = self.entries.insert(coordinate.clone(), entry) {
                tracing::debug!("Cost entry for {coordinate} was overwritten, previous value: {previous:?}");
            }
        }
    }
}

impl FromIterator<(SchemaCoordinate, CostEntry)> for CostMap {
    fn from_iter<T: IntoIterator<Item = (SchemaCoordinate, CostEntry)>>(iter: T) -> Self {
        CostMap {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CostMap {
    type Item = (SchemaCoordinate, CostEntry);
    type IntoIter = btree_map::IntoIter<SchemaCoordinate, CostEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a CostMap {
    type Item = (&'a SchemaCoordinate, &'a CostEntry);
    type IntoIter = btree_map::Iter<'a, SchemaCoordinate, CostEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
