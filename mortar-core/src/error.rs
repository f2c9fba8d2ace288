use crate::Error;
use std::fmt::Debug;

/// Failure of a repository operation, carrying the selection or item it was about.
///
/// Every error reaching the adapter boundary (construction, compilation or execution) is
/// wrapped exactly once into this type and never retried.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed for {subject}")]
pub struct RepositoryError {
    /// Adapter operation that failed.
    pub operation: &'static str,
    /// Debug rendering of the offending selection or item.
    pub subject: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl RepositoryError {
    pub fn new(operation: &'static str, subject: &impl Debug, error: Error) -> Self {
        let subject = format!("{subject:?}");
        log::error!("{operation} failed for {subject}: {error:#}");
        Self {
            operation,
            subject,
            source: error.into(),
        }
    }
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::RepositoryError;
    use crate::{Error, ErrorContext};
    use std::error::Error as _;

    #[test]
    fn keeps_subject_and_source() {
        let error = Err::<(), _>(Error::msg("connection reset"))
            .context("While executing query")
            .unwrap_err();
        let error = RepositoryError::new("delete_selection", &"Account(dbo.Account)", error);
        assert_eq!(
            error.to_string(),
            r#"delete_selection failed for "Account(dbo.Account)""#
        );
        let source = error.source().expect("source");
        assert_eq!(source.to_string(), "While executing query");
    }
}
