use std::path::PathBuf;
use std::process::ExitStatus;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

/// Failure while reading the project file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read project file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("project file is not valid XML")]
    Xml(#[from] roxmltree::Error),

    #[error("project file has no {0}")]
    MissingNode(&'static str),

    #[error("invalid {what}: {value:?}")]
    InvalidValue { what: &'static str, value: String },

    #[error("frame rate denominator is zero")]
    ZeroDenominator,

    #[error("guides property is not a valid guide list")]
    Guides(#[from] serde_json::Error),
}

/// Failure of an external tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to run {tool} ({})", program.display())]
    Spawn {
        tool: &'static str,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}\n{stderr}")]
    Failed {
        tool: &'static str,
        status: ExitStatus,
        stderr: String,
    },
}
