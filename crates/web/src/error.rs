use std::io;

use thiserror::Error;

/// A route pattern that can not be registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteBuildError {
    #[error("placeholder `:{name}` appears twice in route `{pattern}`")]
    DuplicatePlaceholder { pattern: String, name: String },

    #[error("placeholders and wildcards need a literal between them in route `{pattern}`")]
    AdjacentPlaceholders { pattern: String },

    #[error("route `{pattern}` has more than {max} placeholders")]
    TooManyPlaceholders { pattern: String, max: usize },

    #[error("wildcard must end route `{pattern}`")]
    WildcardNotAtEnd { pattern: String },

    #[error("placeholder without a name in route `{pattern}`")]
    EmptyPlaceholderName { pattern: String },
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,

    #[error("invalid address: {source}")]
    InvalidAddress {
        #[from]
        source: io::Error,
    },
}
