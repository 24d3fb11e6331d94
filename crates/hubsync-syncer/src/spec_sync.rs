//! Down-direction behavior: replicate specs from the global hub to a
//! regional hub.

use tracing::info;

use hubsync_api::identity::ResourceIdentity;
use hubsync_api::object::Object;
use hubsync_cluster::ClusterError;

use crate::controller::SyncController;
use crate::error::SyncError;
use crate::SYNCER_FIELD_MANAGER;

impl SyncController {
    /// Apply the full source object downstream: strip server-assigned
    /// fields and force-merge under the syncer's field manager. The
    /// destination converges to the source regardless of its prior
    /// state, and re-application is a no-op.
    pub(crate) async fn apply_to_downstream(&self, obj: &Object) -> Result<(), SyncError> {
        let downstream = obj.stripped();
        self.to().apply(SYNCER_FIELD_MANAGER, downstream).await?;
        info!(
            controller = %self.name(),
            object = %obj.qualified_name(),
            "upserted downstream"
        );
        Ok(())
    }

    /// Remove the corresponding object downstream once the source is
    /// gone. Already-absent destinations are fine.
    pub(crate) async fn delete_from_downstream(&self, id: &ResourceIdentity) -> Result<(), SyncError> {
        match self
            .to()
            .delete(&id.kind, id.namespace.as_deref(), &id.name)
            .await
        {
            Ok(_) => {
                info!(controller = %self.name(), identity = %id, "deleted downstream");
                Ok(())
            }
            Err(ClusterError::NotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
