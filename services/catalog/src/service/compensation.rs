use crate::asset::AssetId;
use crate::asset_store::AssetStore;
use crate::error::ServiceError;
use tracing::{error, warn};

/// Undo an upload whose metadata row was never committed.
///
/// Returns `cause` when the asset is gone again. If the delete fails the
/// asset is leaked; both errors are returned together and the identifier is
/// logged so the blob can be found and removed by hand.
pub(crate) async fn compensate(
    assets: &AssetStore,
    asset_id: &AssetId,
    cause: ServiceError,
) -> ServiceError {
    metrics::counter!("catalog.compensations").increment(1);
    warn!(asset_id = %asset_id, cause = %cause, "Deleting asset of failed operation");

    match assets.delete(asset_id).await {
        Ok(()) => cause,
        Err(compensation) => {
            metrics::counter!("catalog.compensations.failed").increment(1);
            error!(
                asset_id = %asset_id,
                cause = %cause,
                error = %compensation,
                "Compensating delete failed, asset leaked"
            );
            ServiceError::CompensationFailed {
                asset_id: asset_id.clone(),
                cause: Box::new(cause),
                compensation,
            }
        }
    }
}
