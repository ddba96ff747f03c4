use std::{fmt, str::FromStr};

/// A stable name for a type system member, used as the key for both cost
/// entries and operation counts.
///
/// The canonical string forms are:
///
/// - `Type`
/// - `Type.field`
/// - `Type.field(argument:)`
/// - `Type.field@directive`
/// - `Type.field@directive(argument:)`
/// - `@directive`
/// - `@directive(argument:)`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SchemaCoordinate {
    Type {
        name: String,
    },
    Field {
        type_name: String,
        field: String,
    },
    FieldArgument {
        type_name: String,
        field: String,
        argument: String,
    },
    FieldDirective {
        type_name: String,
        field: String,
        directive: String,
    },
    FieldDirectiveArgument {
        type_name: String,
        field: String,
        directive: String,
        argument: String,
    },
    Directive {
        directive: String,
    },
    DirectiveArgument {
        directive: String,
        argument: String,
    },
}

impl SchemaCoordinate {
    pub fn ty(name: impl Into<String>) -> Self {
        SchemaCoordinate::Type { name: name.into() }
    }

    pub fn field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        SchemaCoordinate::Field {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    pub fn field_argument(type_name: impl Into<String>, field: impl Into<String>, argument: impl Into<String>) -> Self {
        SchemaCoordinate::FieldArgument {
            type_name: type_name.into(),
            field: field.into(),
            argument: argument.into(),
        }
    }

    pub fn directive_argument(directive: impl Into<String>, argument: impl Into<String>) -> Self {
        SchemaCoordinate::DirectiveArgument {
            directive: directive.into(),
            argument: argument.into(),
        }
    }

    /// The `Type.field` part of a field, field argument or field directive coordinate.
    pub fn field_part(&self) -> Option<(&str, &str)> {
        match self {
            SchemaCoordinate::Field { type_name, field }
            | SchemaCoordinate::FieldArgument { type_name, field, .. }
            | SchemaCoordinate::FieldDirective { type_name, field, .. }
            | SchemaCoordinate::FieldDirectiveArgument { type_name, field, .. } => Some((type_name, field)),
            SchemaCoordinate::Type { .. }
            | SchemaCoordinate::Directive { .. }
            | SchemaCoordinate::DirectiveArgument { .. } => None,
        }
    }

    /// Returns a coordinate on the same field with the usage of a directive appended.
    pub(crate) fn with_directive(&self, usage: &DirectiveUsage) -> Option<Self> {
        let (type_name, field) = self.field_part()?;

        Some(match &usage.argument {
            Some(argument) => SchemaCoordinate::FieldDirectiveArgument {
                type_name: type_name.to_owned(),
                field: field.to_owned(),
                directive: usage.name.clone(),
                argument: argument.clone(),
            },
            None => SchemaCoordinate::FieldDirective {
                type_name: type_name.to_owned(),
                field: field.to_owned(),
                directive: usage.name.clone(),
            },
        })
    }
}

impl fmt::Display for SchemaCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaCoordinate::Type { name } => f.write_str(name),
            SchemaCoordinate::Field { type_name, field } => write!(f, "{type_name}.{field}"),
            SchemaCoordinate::FieldArgument {
                type_name,
                field,
                argument,
            } => write!(f, "{type_name}.{field}({argument}:)"),
            SchemaCoordinate::FieldDirective {
                type_name,
                field,
                directive,
            } => write!(f, "{type_name}.{field}@{directive}"),
            SchemaCoordinate::FieldDirectiveArgument {
                type_name,
                field,
                directive,
                argument,
            } => write!(f, "{type_name}.{field}@{directive}({argument}:)"),
            SchemaCoordinate::Directive { directive } => write!(f, "@{directive}"),
            SchemaCoordinate::DirectiveArgument { directive, argument } => write!(f, "@{directive}({argument}:)"),
        }
    }
}

impl From<SchemaCoordinate> for String {
    fn from(value: SchemaCoordinate) -> Self {
        value.to_string()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid schema coordinate: `{0}`")]
pub struct InvalidCoordinate(String);

impl TryFrom<String> for SchemaCoordinate {
    type Error = InvalidCoordinate;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for SchemaCoordinate {
    type Err = InvalidCoordinate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCoordinate(s.to_owned());

        if let Some(directive) = s.strip_prefix('@') {
            let usage = DirectiveUsage::parse(directive).ok_or_else(invalid)?;

            return Ok(match usage.argument {
                Some(argument) => SchemaCoordinate::DirectiveArgument {
                    directive: usage.name,
                    argument,
                },
                None => SchemaCoordinate::Directive { directive: usage.name },
            });
        }

        let (member, directive) = match s.split_once('@') {
            Some((member, directive)) => (member, Some(DirectiveUsage::parse(directive).ok_or_else(invalid)?)),
            None => (s, None),
        };

        let Some((type_name, rest)) = member.split_once('.') else {
            if directive.is_some() || !is_name(member) {
                return Err(invalid());
            }
            return Ok(SchemaCoordinate::ty(member));
        };

        let (field, argument) = split_argument(rest).ok_or_else(invalid)?;

        if !is_name(type_name) {
            return Err(invalid());
        }

        match (argument, directive) {
            (None, None) => Ok(SchemaCoordinate::field(type_name, field)),
            (Some(argument), None) => Ok(SchemaCoordinate::field_argument(type_name, field, argument)),
            (None, Some(usage)) => SchemaCoordinate::field(type_name, field)
                .with_directive(&usage)
                .ok_or_else(invalid),
            (Some(_), Some(_)) => Err(invalid()),
        }
    }
}

/// A directive applied in the type system, relative to the member it is applied on: `@name` or
/// `@name(argument:)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DirectiveUsage {
    pub name: String,
    pub argument: Option<String>,
}

impl DirectiveUsage {
    pub fn new(name: impl Into<String>, argument: Option<String>) -> Self {
        DirectiveUsage {
            name: name.into(),
            argument,
        }
    }

    /// Parses the part after the `@`.
    fn parse(s: &str) -> Option<Self> {
        let (name, argument) = split_argument(s)?;

        Some(DirectiveUsage {
            name: name.to_owned(),
            argument: argument.map(str::to_owned),
        })
    }
}

impl fmt::Display for DirectiveUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "@{}({argument}:)", self.name),
            None => write!(f, "@{}", self.name),
        }
    }
}

impl From<DirectiveUsage> for String {
    fn from(value: DirectiveUsage) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for DirectiveUsage {
    type Error = InvalidCoordinate;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .strip_prefix('@')
            .and_then(DirectiveUsage::parse)
            .ok_or(InvalidCoordinate(value))
    }
}

/// Splits `name(argument:)` into its parts.
fn split_argument(s: &str) -> Option<(&str, Option<&str>)> {
    let Some((name, argument)) = s.split_once('(') else {
        return is_name(s).then_some((s, None));
    };

    let argument = argument.strip_suffix(":)")?;

    (is_name(name) && is_name(argument)).then_some((name, Some(argument)))
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();

    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
