use crate::{
    cost_map::{CostEntry, CostMap},
    error::AnalysisError,
    estimate::{list_size, validate_slicing_arguments, SizedField},
    traversal::{FieldSizer, ParentFieldFrame, VisitedField},
    Variables,
};

/// Sizes fields from their `@listSize` annotations, giving an upper bound of the operation cost.
pub(crate) struct StaticSizer<'a> {
    cost_map: &'a CostMap,
    variables: &'a Variables,
    pending: Option<PendingSizedFields<'a>>,
}

/// A field declaring `sizedFields`, waiting for its children to be visited.
struct PendingSizedFields<'a> {
    entry: &'a CostEntry,
    owner: SizedField<'a>,
    /// Depth of the children of the owner.
    depth: usize,
    remaining: Vec<&'a str>,
}

impl<'a> StaticSizer<'a> {
    pub fn new(cost_map: &'a CostMap, variables: &'a Variables) -> Self {
        StaticSizer {
            cost_map,
            variables,
            pending: None,
        }
    }

    fn take_sized_field(&mut self, field: &VisitedField<'a>) -> Option<u64> {
        let pending = self.pending.as_mut().filter(|pending| pending.depth == field.depth)?;
        let position = pending.remaining.iter().position(|name| *name == field.name())?;

        pending.remaining.remove(position);

        let size = list_size(self.cost_map, pending.entry, pending.owner, self.variables);

        if pending.remaining.is_empty() {
            self.pending = None;
        }

        Some(size)
    }
}

impl<'a> FieldSizer<'a> for StaticSizer<'a> {
    fn field_size(&mut self, field: &VisitedField<'a>, _: &[ParentFieldFrame<'a>]) -> Result<u64, AnalysisError> {
        let coordinate = field.coordinate();
        let entry = self.cost_map.get(&coordinate);

        if let Some(entry) = entry {
            validate_slicing_arguments(entry, &coordinate, field.sized(), self.variables)?;
        }

        if let Some(size) = self.take_sized_field(field) {
            return Ok(size);
        }

        let Some(entry) = entry else {
            return Ok(1);
        };

        match &entry.sized_fields {
            None => Ok(list_size(self.cost_map, entry, field.sized(), self.variables)),
            Some(sized_fields) => {
                if !field.is_composite || sized_fields.is_empty() {
                    return Ok(1);
                }

                // A nested declaration replaces the current one.
                self.pending = Some(PendingSizedFields {
                    entry,
                    owner: field.sized(),
                    depth: field.depth + 1,
                    remaining: sized_fields.iter().map(String::as_str).collect(),
                });

                Ok(1)
            }
        }
    }

    fn leave_field(&mut self, field: &VisitedField<'a>) {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.depth == field.depth + 1)
        {
            self.pending = None;
        }
    }
}
