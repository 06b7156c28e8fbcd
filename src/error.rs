use std::fmt;

/// Error taxonomy for the strategy evaluation engine.
///
/// `InvalidPricingInput` and `MalformedContract` are local conditions: the
/// offending contract is skipped and counted while the scan continues. The
/// remaining variants propagate to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// Non-positive time-to-expiry or volatility passed to the pricing model.
    InvalidPricingInput(String),
    /// Provider record missing strike/expiry or carrying a non-positive premium.
    MalformedContract(String),
    /// The funnel reduced the candidate set to zero. A normal "no results"
    /// outcome, not a crash.
    NoCandidatesFound { symbol: String, strategy: String },
    /// Unknown criteria name or out-of-domain bound. Fails the scan before
    /// any pricing work.
    InvalidFilterCriteria(String),
    /// Data-provider failure. The scan aborts with no partial results.
    Fetch(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanError::InvalidPricingInput(msg) => write!(f, "Invalid pricing input: {}", msg),
            ScanError::MalformedContract(msg) => write!(f, "Malformed contract: {}", msg),
            ScanError::NoCandidatesFound { symbol, strategy } => {
                write!(f, "No {} candidates found for {}", strategy, symbol)
            }
            ScanError::InvalidFilterCriteria(msg) => write!(f, "Invalid filter criteria: {}", msg),
            ScanError::Fetch(msg) => write!(f, "Fetch error: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Fetch(format!("chain payload parse: {}", err))
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::Fetch(err.to_string())
    }
}
