use std::path::PathBuf;
use std::process::ExitStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record lacks a field it cannot be rebuilt without
    #[error("{kind} \"{id}\" has no \"{field}\" field")]
    MissingField {
        kind: &'static str,
        id: String,
        field: String,
    },

    /// An `eval`/`ref` expression does not have the expected shape
    #[error("{kind} \"{id}\": malformed expression in \"{field}\": {reason}")]
    MalformedExpression {
        kind: &'static str,
        id: String,
        field: String,
        reason: String,
    },

    /// A `model_id` search domain other than `[('model', '=', 'x.y')]`
    #[error("{kind} \"{id}\" has a model search other than \"[('model', '=', 'MODEL.NAME')]\"")]
    MalformedSearch { kind: &'static str, id: String },

    #[error("data file must hold exactly one scenario, found {count}")]
    ScenarioCount { count: usize },

    #[error("side-car file {} is missing: {source}", path.display())]
    MissingSideCar {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("manifest has no usable \"{field}\" entry")]
    ManifestField { field: String },

    #[error("manifest is malformed: {reason}")]
    ManifestShape { reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot install logger: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{program} exited with {status}")]
    Command { program: String, status: ExitStatus },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
