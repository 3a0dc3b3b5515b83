use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error(
        "Insufficient stock for {product}{}. Only {available} items available.",
        .size.as_ref().map(|s| format!(" in size {s}")).unwrap_or_default()
    )]
    InsufficientStock {
        product: String,
        size: Option<String>,
        available: i32,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_names_size_when_present() {
        let err = DomainError::InsufficientStock {
            product: "Moon Ring".to_string(),
            size: Some("7-8".to_string()),
            available: 0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Moon Ring in size 7-8. Only 0 items available."
        );
    }

    #[test]
    fn insufficient_stock_without_size() {
        let err = DomainError::InsufficientStock {
            product: "Pearl Necklace".to_string(),
            size: None,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Pearl Necklace. Only 2 items available."
        );
    }
}
