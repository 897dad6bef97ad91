use thiserror::Error;

pub mod coordinate;
pub mod pom;
pub mod record;

pub use coordinate::Coordinate;
pub use record::{CheckStatus, DependencyRecord, DependencySnapshot, StatusUpdate};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading descriptor: {0}")]
    IO(#[from] std::io::Error),
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::de::DeError),
    #[error("Missing POM element `{0}` in {1}")]
    MissingElement(String, String),
    #[error("Invalid coordinate `{0}`, expected group:artifact:version[:packaging]")]
    InvalidCoordinate(String),
}
