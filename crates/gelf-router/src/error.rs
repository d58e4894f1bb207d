use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("rule engine error: {0}")]
    Rule(#[from] RuleError),

    #[error("sender error: {0}")]
    Sender(String),

    #[error("store forwarder error: {0}")]
    Store(String),

    #[error("codec error: {0}")]
    Codec(#[from] gelf_codec::CodecError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised while compiling the filters/destinations/rules document. Any
/// unresolved matcher or destination name is a hard startup failure, never
/// a silently-dropped rule.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{rule}' references undefined matcher '{name}'")]
    UnknownMatcher { rule: String, name: String },

    #[error("rule '{rule}' references undefined destination '{name}'")]
    UnknownDestination { rule: String, name: String },

    #[error("matcher '{name}' has invalid regex: {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("matcher '{name}' has an unrecognized kind: {kind}")]
    UnknownMatcherKind { name: String, kind: String },

    #[error("destination '{name}' has an unrecognized kind: {kind}")]
    UnknownDestinationKind { name: String, kind: String },

    #[error("malformed filters document: {0}")]
    Malformed(String),
}
