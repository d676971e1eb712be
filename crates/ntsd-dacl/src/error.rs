use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaclError {
    #[error("No directory object matched the search filter {0:?}")]
    NotFound(String),

    #[error("The search filter {0:?} matched more than one directory object")]
    TooManyResults(String),

    /// The directory search collaborator failed.
    #[error("Directory search failed: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Security descriptor error: {0}")]
    Dtyp(#[from] ntsd_dtyp::DtypError),

    #[error("The security descriptor has no DACL")]
    MissingDacl,
}
