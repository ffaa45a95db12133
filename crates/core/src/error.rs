/// Top-level error type. All public API functions return this or one of its parts.
#[derive(Debug, thiserror::Error)]
pub enum DoubanError {
    #[error("Metadata lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request to {url} failed with HTTP status {status}")]
    HttpStatus { status: u16, url: String },

    #[error("Malformed response body: {0}")]
    Decode(String),

    #[error("Book record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Book record field `{field}` has invalid value {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
