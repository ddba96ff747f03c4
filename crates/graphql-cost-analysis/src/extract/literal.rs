use async_graphql_value::ConstValue;

/// The shape of a constant value written in the type system, as far as cost directives care.
#[derive(Debug, PartialEq)]
pub(super) enum Literal<'a> {
    Int(i64),
    Float(f64),
    String(&'a str),
    Boolean(bool),
    Enum(&'a str),
    List(Vec<Literal<'a>>),
    Object,
    Null,
}

impl<'a> From<&'a ConstValue> for Literal<'a> {
    fn from(value: &'a ConstValue) -> Self {
        match value {
            ConstValue::Number(number) => match number.as_i64() {
                Some(int) => Literal::Int(int),
                None => number.as_f64().map(Literal::Float).unwrap_or(Literal::Null),
            },
            ConstValue::String(string) => Literal::String(string.as_str()),
            ConstValue::Boolean(boolean) => Literal::Boolean(*boolean),
            ConstValue::Enum(name) => Literal::Enum(name.as_str()),
            ConstValue::List(items) => Literal::List(items.iter().map(Literal::from).collect()),
            ConstValue::Object(_) => Literal::Object,
            ConstValue::Null | ConstValue::Binary(_) => Literal::Null,
        }
    }
}

impl Literal<'_> {
    /// `@cost(weight:)`: a decimal string. Numbers are accepted as well.
    pub(super) fn as_weight(&self) -> Option<String> {
        let weight = match self {
            Literal::String(weight) => weight.trim().to_owned(),
            Literal::Int(weight) => weight.to_string(),
            Literal::Float(weight) => weight.to_string(),
            Literal::Boolean(_) | Literal::Enum(_) | Literal::List(_) | Literal::Object | Literal::Null => {
                return None
            }
        };

        weight.parse::<f64>().ok().filter(|weight| weight.is_finite())?;

        Some(weight)
    }

    pub(super) fn as_size(&self) -> Option<u64> {
        match self {
            Literal::Int(size) => u64::try_from(*size).ok(),
            Literal::Float(_)
            | Literal::String(_)
            | Literal::Boolean(_)
            | Literal::Enum(_)
            | Literal::List(_)
            | Literal::Object
            | Literal::Null => None,
        }
    }

    /// A list of names. A single string is coerced into a list of one, as in input coercion.
    pub(super) fn as_names(&self) -> Option<Vec<String>> {
        match self {
            Literal::List(items) => Some(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Literal::String(name) if !name.is_empty() => Some((*name).to_owned()),
                        _ => None,
                    })
                    .collect(),
            ),
            Literal::String(name) if !name.is_empty() => Some(vec![(*name).to_owned()]),
            Literal::String(_)
            | Literal::Int(_)
            | Literal::Float(_)
            | Literal::Boolean(_)
            | Literal::Enum(_)
            | Literal::Object
            | Literal::Null => None,
        }
    }

    pub(super) fn as_boolean(&self) -> Option<bool> {
        match self {
            Literal::Boolean(boolean) => Some(*boolean),
            Literal::Int(_)
            | Literal::Float(_)
            | Literal::String(_)
            | Literal::Enum(_)
            | Literal::List(_)
            | Literal::Object
            | Literal::Null => None,
        }
    }

    /// Textual form of a scalar default value. Lists, objects and null have none.
    pub(super) fn as_default_value(&self) -> Option<String> {
        match self {
            Literal::Int(value) => Some(value.to_string()),
            Literal::Float(value) => Some(value.to_string()),
            Literal::String(value) | Literal::Enum(value) => Some((*value).to_owned()),
            Literal::Boolean(value) => Some(value.to_string()),
            Literal::List(_) | Literal::Object | Literal::Null => None,
        }
    }
}
