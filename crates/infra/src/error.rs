//! Service-level error type: domain failures plus store failures.

use thiserror::Error;

use storefront_core::DomainError;

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// The domain error, when this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            ServiceError::Store(_) => None,
        }
    }

    pub fn is_stock_shortage(&self) -> bool {
        self.as_domain().is_some_and(DomainError::is_stock_shortage)
    }
}
