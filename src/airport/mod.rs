//! Airport world model: surface graph, aircraft models, flight records
//! and departure instances.

pub mod aircraft;
pub mod graph;
pub mod instance;
pub mod model;

/// Error type for data-file loading failures. All variants are fatal for
/// the run that requested the load.
#[derive(Debug)]
pub enum LoadError {
    /// File could not be read
    Io(String),

    /// File content could not be parsed
    Parse(String),

    /// A vertex name was not found in the airport graph
    UnknownVertex(String),

    /// An edge endpoint pair has no connecting edge
    UnknownEdge(String),

    /// An aircraft model name was not found in the model table
    UnknownModel(String),

    /// A value/probability pair is malformed
    Distribution(String),

    /// The run configuration is malformed
    Config(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {}", e),
            LoadError::Parse(e) => write!(f, "parse error: {}", e),
            LoadError::UnknownVertex(name) => write!(f, "unknown vertex: {}", name),
            LoadError::UnknownEdge(name) => write!(f, "unknown edge: {}", name),
            LoadError::UnknownModel(name) => write!(f, "unknown aircraft model: {}", name),
            LoadError::Distribution(e) => write!(f, "invalid distribution: {}", e),
            LoadError::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(e: serde_yaml::Error) -> Self {
        LoadError::Parse(e.to_string())
    }
}
