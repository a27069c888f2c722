use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// Some demanded piece is longer than every stock length offered for it.
    #[error("demand exceeds available stock length for part(s): {}", .parts.join(", "))]
    DemandExceedsStock { parts: Vec<String> },

    /// No anchor fits a fresh bar even though validation passed.
    #[error(
        "internal packing invariant violated: no piece of {part_number} ({finish}) fits a {stock_length} bar"
    )]
    InternalPackingInvariant {
        part_number: String,
        finish: String,
        stock_length: f64,
    },

    #[error("no candidate stock length in {min}..={max}")]
    InvalidSearchRange { min: u32, max: u32 },

    #[error("best-length search cancelled")]
    Cancelled,
}

impl OptimizeError {
    /// Whether the caller's input caused the failure, as opposed to a defect here.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            OptimizeError::DemandExceedsStock { .. } | OptimizeError::InvalidSearchRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, OptimizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demand_error_names_every_part() {
        let err = OptimizeError::DemandExceedsStock {
            parts: vec!["B".into(), "C-12".into()],
        };
        assert_eq!(
            err.to_string(),
            "demand exceeds available stock length for part(s): B, C-12"
        );
        assert!(err.is_user_error());
    }

    #[test]
    fn test_invariant_is_not_user_error() {
        let err = OptimizeError::InternalPackingInvariant {
            part_number: "A".into(),
            finish: "CLR".into(),
            stock_length: 288.0,
        };
        assert!(!err.is_user_error());
        assert!(err.to_string().contains("A (CLR)"));
    }
}
