//! Transaction boundary.
//!
//! [`transactional`] opens a store transaction, hands it to a body, and
//! commits when the body returns `Ok`. On `Err` it rolls back and returns the
//! body's error; a failing rollback is logged and never replaces that error.
//! If the returned future is dropped mid-way, the transaction handle is
//! dropped with it and the backend discards its writes.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::error::ServiceResult;
use crate::store::{Storage, StoreTx};

/// Boxed future returned by a transaction body, borrowing the handle for `'t`.
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = ServiceResult<T>> + Send + 't>>;

/// Run `body` inside one store transaction.
///
/// ```ignore
/// let id = transactional(&*store, "create_user", move |tx| {
///     Box::pin(async move {
///         let id = tx.insert_user(&user).await?;
///         tx.insert_cart(id).await?;
///         Ok(id)
///     })
/// })
/// .await?;
/// ```
pub async fn transactional<T, F>(
    store: &dyn Storage,
    operation: &'static str,
    body: F,
) -> ServiceResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn StoreTx) -> TxFuture<'t, T> + Send,
{
    let mut tx = store.begin().await?;
    let outcome = body(tx.as_mut()).await;

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            debug!(operation, "transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(operation, error = %rollback_err, "rollback failed");
            } else {
                debug!(operation, error = %err, "transaction rolled back");
            }
            Err(err)
        }
    }
}
