use crate::core::error::EngineError;
use crate::services::TransactionScope;

/// Commit on success, roll back on failure, and hand the result back
pub(crate) async fn conclude<T, R>(
    trx: &T,
    tx: T::Tx,
    result: Result<R, EngineError>,
    op: &'static str,
) -> Result<R, EngineError>
where
    T: TransactionScope,
    R: Send,
{
    match result {
        Ok(value) => {
            trx.commit(tx).await.map_err(EngineError::store(op))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = trx.rollback(tx).await {
                tracing::warn!("{}: rollback failed: {}", op, rollback_err);
            }
            Err(err)
        }
    }
}

/// Ids in the order their rows must be locked
pub(crate) fn lock_order(ids: &[i64]) -> Vec<i64> {
    let mut ordered = ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();
    ordered
}
