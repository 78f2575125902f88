use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// The database is locked by another writer. Callers on contended
    /// paths (toggles, workflow CAS) retry once before surfacing this.
    #[error("database busy: {0}")]
    Busy(String),
}

impl SQLError {
    pub fn is_busy(&self) -> bool {
        matches!(self, SQLError::Busy(_))
    }
}
