use crate::{
    coordinate::SchemaCoordinate,
    cost_map::CostMap,
    count::{Counts, OperationCountData},
};

const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCostData {
    pub type_cost: f64,
    pub field_cost: f64,
}

/// Weighs the counts of an operation.
///
/// Types and fields weigh 1 unless annotated. Arguments, input fields and directive arguments only
/// add to the cost of their field when they carry a weight.
pub fn compute_cost(counts: &OperationCountData, cost_map: &CostMap) -> OperationCostData {
    let type_cost = counts
        .type_counts
        .iter()
        .map(|(coordinate, count)| *count as f64 * cost_map.weight(coordinate).unwrap_or(DEFAULT_WEIGHT))
        .sum::<f64>()
        .max(0.0);

    let field_cost = counts
        .field_counts
        .iter()
        .map(|(coordinate, count)| field_cost(counts, cost_map, coordinate, *count as f64).max(0.0))
        .sum();

    OperationCostData { type_cost, field_cost }
}

fn field_cost(counts: &OperationCountData, cost_map: &CostMap, coordinate: &SchemaCoordinate, count: f64) -> f64 {
    let mut cost = count * cost_map.weight(coordinate).unwrap_or(DEFAULT_WEIGHT);

    let Some(field) = coordinate.field_part() else {
        return cost;
    };

    for argument in on_field(&counts.field_argument_counts, field) {
        let Some(entry) = cost_map.get(argument) else {
            continue;
        };

        if let Some(weight) = entry.weight() {
            cost += count * weight;
        }

        if let Some(argument_type) = &entry.argument_type {
            for input_field in counts.input_field_counts.keys() {
                let is_argument_type = matches!(
                    input_field,
                    SchemaCoordinate::Field { type_name, .. } if type_name == argument_type
                );

                if let Some(weight) = is_argument_type.then(|| cost_map.weight(input_field)).flatten() {
                    cost += count * weight;
                }
            }
        }
    }

    for (directive_argument, directive_count) in counts
        .directive_argument_counts
        .iter()
        .filter(|(coordinate, _)| coordinate.field_part() == Some(field))
    {
        let SchemaCoordinate::FieldDirectiveArgument { directive, argument, .. } = directive_argument else {
            continue;
        };

        if let Some(weight) = cost_map.weight(&SchemaCoordinate::directive_argument(directive, argument)) {
            cost += *directive_count as f64 * weight;
        }
    }

    cost
}

fn on_field<'a>(counts: &'a Counts, field: (&'a str, &'a str)) -> impl Iterator<Item = &'a SchemaCoordinate> + 'a {
    counts
        .keys()
        .filter(move |coordinate| coordinate.field_part() == Some(field))
}
