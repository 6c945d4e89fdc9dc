use thiserror::Error;

use crate::validator::ValidationErrors;
use pulse_common::CommonError;

#[derive(Error, Debug)]
pub enum BamError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
    #[error("incompatible request: {0}")]
    IncompatibleRequest(String),
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(
        "invalid sequencing chemistry: binding kit '{binding_kit}', \
         sequencing kit '{sequencing_kit}', basecaller version '{basecaller_version}'"
    )]
    InvalidChemistry {
        binding_kit: String,
        sequencing_kit: String,
        basecaller_version: String,
    },
    #[error("{0}")]
    ValidationFailed(ValidationErrors),
    #[error(transparent)]
    Common(#[from] CommonError),
}
