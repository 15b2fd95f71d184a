use thiserror::Error;

#[derive(Error, Debug)]
pub enum NlxError {
    #[error("IO Error")]
    IOError(#[from] std::io::Error),
    #[error("cannot serialize header")]
    JsonError(#[from] serde_json::Error),
    #[error("Neuralynx header must start with 8 # characters but began with `{0}`")]
    BadHeaderMarker(String),
    #[error("Number of channel ids ({1}) does not match {0} values ({2})")]
    ChannelCountMismatch(String, usize, usize),
    #[error("Can not convert `{1}` to bool for property {0}")]
    BadBool(String, String),
    #[error("Can not convert `{1}` to a number for property {0}")]
    BadNumber(String, String),
    #[error("Header contains both CheetahRev `{0}` and ApplicationName `{1}`")]
    ConflictingApplicationName(String, String),
    #[error("Impossible to find application name and version in `{0}`")]
    AmbiguousApplicationName(String),
    #[error("Can not parse application version `{0}`")]
    BadVersion(String),
    #[error("No matching header {0} date/time for application {1} version {2}")]
    MissingTimestamp(String, String, String),
    #[error("Invalid header dialect pattern `{0}`: {1}")]
    BadPattern(String, String),
    #[error("Acquisition system `{0}` does not name a known acquisition type")]
    UnknownAcquisitionSystem(String),
    #[error("Neuralynx header error: `{0}`")]
    Unknown(String),
}

impl NlxError {
    /// True for every failure caused by the header content rather than by reading the file.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, NlxError::IOError(_) | NlxError::JsonError(_))
    }
}
