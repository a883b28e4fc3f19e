//! Error type shared by the library modules.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    Service {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("could not geocode '{0}'")]
    Geocode(String),

    #[error("invalid OSM id '{0}', expected a N/W/R prefix followed by digits")]
    InvalidOsmId(String),

    #[error("perimeter is empty")]
    EmptyPerimeter,

    #[error("layer '{0}' needs an elevation source")]
    MissingElevation(String),

    #[error("elevation grid: {0}")]
    Elevation(String),

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}
