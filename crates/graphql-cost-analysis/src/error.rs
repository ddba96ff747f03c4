use crate::coordinate::SchemaCoordinate;

/// The schema source could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("could not parse schema: {0}")]
    Parse(#[from] async_graphql_parser::Error),
}

/// The supergraph does not describe where the subgraphs live.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("could not parse supergraph SDL: {0}")]
    InvalidSupergraph(#[source] async_graphql_parser::Error),
    #[error("No \"join__Graph\" enum found in the supergraph SDL")]
    MissingGraphEnum,
    #[error("The \"@join__graph\" directive can't be found on any of the \"join__Graph\" enum values")]
    NoGraphs,
    #[error("Can't get service URL from \"join__graph\" directive argument on `{0}`")]
    MissingServiceUrl(String),
    #[error("Invalid service URL `{url}` for `{graph}`: {error}")]
    InvalidServiceUrl {
        graph: String,
        url: String,
        #[source]
        error: url::ParseError,
    },
}

/// The operation cannot be analyzed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Only one slicing argument is allowed for the {0} field")]
    TooManySlicingArguments(SchemaCoordinate),
    #[error("Unknown operation named \"{0}\"")]
    UnknownOperation(String),
    #[error("Operation name is required when the document contains multiple operations")]
    OperationNameRequired,
    #[error("The document does not contain any operation")]
    NoOperation,
    #[error("The schema does not define a root type for {0} operations")]
    MissingRootType(&'static str),
}
