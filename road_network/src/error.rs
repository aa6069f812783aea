use std::fmt;

use geom::FitError;

/// Why an edit failed. These travel inside `anyhow::Error`; use `downcast_ref::<EditError>()` to
/// tell them apart.
#[derive(Clone, Debug, PartialEq)]
pub enum EditError {
    /// The geometry can't be built from the input. Aborts the whole edit.
    GeometricDegeneracy(String),
    /// Two things can't be connected, like road ends without compatible lanes.
    TopologyConflict(String),
    /// Something refers to an entity that no longer exists.
    ReferentialIntegrityViolation(String),
    /// The caller asked for an entity that doesn't exist.
    UnknownEntity(String),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EditError::GeometricDegeneracy(msg) => write!(f, "geometric degeneracy: {}", msg),
            EditError::TopologyConflict(msg) => write!(f, "topology conflict: {}", msg),
            EditError::ReferentialIntegrityViolation(msg) => {
                write!(f, "referential integrity violation: {}", msg)
            }
            EditError::UnknownEntity(msg) => write!(f, "unknown entity: {}", msg),
        }
    }
}

impl std::error::Error for EditError {}

impl From<FitError> for EditError {
    fn from(err: FitError) -> EditError {
        match err {
            FitError::Degenerate(msg) => EditError::GeometricDegeneracy(msg),
        }
    }
}

/// The `EditError` inside an error, if there is one.
pub fn edit_error(err: &anyhow::Error) -> Option<&EditError> {
    err.downcast_ref::<EditError>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_anyhow() {
        let err: anyhow::Error =
            EditError::from(FitError::Degenerate("points reverse".to_string())).into();
        assert_eq!(
            edit_error(&err),
            Some(&EditError::GeometricDegeneracy("points reverse".to_string()))
        );
        assert_eq!(
            err.to_string(),
            "geometric degeneracy: points reverse".to_string()
        );
        assert!(edit_error(&anyhow::anyhow!("something else")).is_none());
    }
}
