//! Up-direction behavior: mirror statuses to the global hub and
//! synthesize the per-regional-hub profile aggregate.

use tracing::{info, warn};

use hubsync_api::identity::kinds;
use hubsync_api::object::Object;
use hubsync_api::profile::HubProfile;
use hubsync_cluster::ClusterError;

use crate::controller::SyncController;
use crate::error::SyncError;
use crate::SYNCER_FIELD_MANAGER;

impl SyncController {
    /// Apply one source object's status upstream.
    ///
    /// Add-on changes only refresh the synthesized hub profile; managed
    /// cluster changes refresh it and additionally mirror the cluster
    /// object itself. Everything else is plain mirroring: a stripped
    /// copy into the syncer's upstream namespace, bootstrap-applied when
    /// absent, otherwise a get-then-update of the status subresource.
    pub(crate) async fn update_status_in_upstream(&self, obj: &Object) -> Result<(), SyncError> {
        if obj.kind == kinds::addons() {
            return self.apply_hub_profile_upstream().await;
        }
        if obj.kind == kinds::managed_clusters() {
            if let Err(err) = self.apply_hub_profile_upstream().await {
                warn!(
                    controller = %self.name(),
                    cluster = %obj.name,
                    %err,
                    "failed to refresh hub profile; continuing"
                );
            }
        }

        let mut upstream = obj.stripped();
        if upstream.namespace.is_some() {
            upstream.namespace = Some(self.syncer_namespace().to_string());
        }

        match self
            .to()
            .get(&upstream.kind, upstream.namespace.as_deref(), &upstream.name)
            .await
        {
            Ok(existing) => {
                upstream.resource_version = existing.resource_version;
                self.to().update_status(upstream).await?;
                info!(
                    controller = %self.name(),
                    object = %obj.qualified_name(),
                    "updated status upstream"
                );
                Ok(())
            }
            Err(ClusterError::NotFound { .. }) => {
                // First sighting upstream: create the mirror, then write
                // the status it arrived with.
                let created = self
                    .to()
                    .apply(SYNCER_FIELD_MANAGER, upstream.clone())
                    .await?;
                let mut with_status = upstream;
                with_status.resource_version = created.resource_version;
                self.to().update_status(with_status).await?;
                info!(
                    controller = %self.name(),
                    object = %obj.qualified_name(),
                    "bootstrapped upstream mirror"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Rebuild the hub profile from the current contents of the managed
    /// cluster and add-on caches — never from the single triggering
    /// object — and force-apply it upstream. This keeps the synthesized
    /// object internally consistent even though its inputs update
    /// independently and out of order.
    pub(crate) async fn apply_hub_profile_upstream(&self) -> Result<(), SyncError> {
        let profile = HubProfile {
            endpoint: self.from_endpoint().to_string(),
            managed_clusters: self.cached_names(&kinds::managed_clusters()),
            addons: self.cached_names(&kinds::addons()),
        };
        let obj = profile.into_object(self.syncer_namespace());
        self.to().apply(SYNCER_FIELD_MANAGER, obj).await?;
        info!(controller = %self.name(), profile = %self.syncer_namespace(), "applied hub profile");
        Ok(())
    }

    fn cached_names(&self, kind: &hubsync_api::identity::ResourceKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .cache(kind)
            .map(|cache| cache.list().into_iter().map(|o| o.name).collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}
