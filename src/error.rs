//! Error types for instance loading and colony runs.

use std::fmt;

/// Errors raised while running the ant colony.
#[derive(Debug, Clone, PartialEq)]
pub enum AcoError {
    /// An ant could not place every remaining node within its retry bound.
    /// Aborts the whole run: no partial solution is returned.
    InfeasibleConstruction {
        iteration: usize,
        ant: usize,
        /// Number of customer nodes the ant had not visited yet.
        unvisited: usize,
    },
    /// A colony parameter is out of range.
    InvalidConfig(String),
    /// The instance handed to the colony is inconsistent.
    InvalidInstance(String),
    /// The dedicated worker pool could not be created.
    ThreadPool(String),
}

impl fmt::Display for AcoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InfeasibleConstruction { iteration, ant, unvisited } => write!(
                f,
                "Ant {} found no feasible construction in iteration {} ({} nodes left unvisited)",
                ant, iteration, unvisited
            ),
            Self::InvalidConfig(msg) => write!(f, "Invalid colony configuration: {}", msg),
            Self::InvalidInstance(msg) => write!(f, "Invalid instance: {}", msg),
            Self::ThreadPool(msg) => write!(f, "Cannot build worker pool: {}", msg),
        }
    }
}

impl std::error::Error for AcoError {}

/// Errors raised while loading datasets and benchmark manifests.
#[derive(Debug)]
pub enum InstanceError {
    Io(std::io::Error),
    /// A line could not be parsed. `line` is 1-based.
    Parse { line: usize, message: String },
    /// Demand vector or matrix does not match the declared node count.
    Dimension(String),
    /// A value is out of range (depot demand, capacity, a demand magnitude).
    Invalid(String),
    Csv(csv::Error),
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse { line, message } => write!(f, "Parse error at line {}: {}", line, message),
            Self::Dimension(msg) => write!(f, "Dimension mismatch: {}", msg),
            Self::Invalid(msg) => write!(f, "Invalid instance data: {}", msg),
            Self::Csv(e) => write!(f, "CSV error: {e}"),
        }
    }
}

impl std::error::Error for InstanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InstanceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for InstanceError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_message_names_ant() {
        let err = AcoError::InfeasibleConstruction { iteration: 3, ant: 7, unvisited: 2 };
        let msg = err.to_string();
        assert!(msg.contains("Ant 7"));
        assert!(msg.contains("iteration 3"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = InstanceError::Parse { line: 4, message: "bad float".to_string() };
        assert_eq!(err.to_string(), "Parse error at line 4: bad float");
    }
}
