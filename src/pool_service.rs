//! Pool workflows.
//!
//! Unique responsibility: run `create`, `list`, `describe` and `delete`
//! against one cluster, dispatching to machine pools or node pools by the
//! cluster's topology.
//!
//! Every workflow starts by looking the cluster up; results are written to the
//! caller's writer so the binary and the tests share one code path.

use std::io::Write;

use log::debug;

use crate::pool_builder::{build_machine_pool, build_node_pool};
use crate::pool_cloud::CloudProvider;
use crate::pool_client::ControlPlane;
use crate::pool_error::PoolError;
use crate::pool_model::{Cluster, Flag, PoolInput, Session};
use crate::pool_output::{
    OutputFormat, describe_machine_pool, describe_node_pool, machine_pools_table, node_pool_json, node_pools_table,
};
use crate::pool_prompt::Prompter;
use crate::pool_resolver::Resolver;
use crate::pool_validate::{is_valid_cluster_key, is_valid_pool_id, parse_labels};

/// Machine pool and node pool workflows over a control plane and a cloud provider.
pub struct PoolService<'a> {
    control_plane: &'a dyn ControlPlane,
    cloud: &'a dyn CloudProvider,
}

impl<'a> PoolService<'a> {
    /// New service.
    #[must_use]
    pub const fn new(control_plane: &'a dyn ControlPlane, cloud: &'a dyn CloudProvider) -> Self {
        Self { control_plane, cloud }
    }

    /// Look a cluster up by ID, name or external ID.
    ///
    /// # Errors
    ///
    /// Malformed key, unknown cluster, or API failure.
    pub async fn fetch_cluster(&self, key: &str) -> Result<Cluster, PoolError> {
        if !is_valid_cluster_key(key) {
            return Err(PoolError::InvalidClusterKey(key.to_string()));
        }
        debug!("Loading cluster '{key}'");
        self.control_plane
            .find_cluster(key)
            .await
            .map_err(PoolError::api(format!("Failed to get cluster '{key}'")))?
            .ok_or_else(|| PoolError::ClusterNotFound(key.to_string()))
    }

    /// Create a machine pool (classic) or node pool (hosted).
    ///
    /// # Errors
    ///
    /// Cluster lookup, resolution, API or output failures.
    pub async fn create(
        &self,
        cluster_key: &str,
        input: &PoolInput,
        session: Session,
        format: OutputFormat,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> Result<(), PoolError> {
        let cluster = self.fetch_cluster(cluster_key).await?;
        if !cluster.is_ready() {
            return Err(PoolError::ClusterNotReady(cluster_key.to_string()));
        }
        if input.is_set(Flag::Labels) {
            parse_labels(&input.labels)?;
        }

        let mut resolver = Resolver::new(self.control_plane, self.cloud, prompter, &cluster, session);
        let (name, created) = if cluster.is_hosted() {
            let request = resolver.resolve_node_pool(input).await?;
            let body = build_node_pool(&request, &cluster);
            debug!("Creating machine pool '{}' on hosted cluster '{cluster_key}'", request.name);
            let created = self
                .control_plane
                .create_node_pool(&cluster.id, &body)
                .await
                .map_err(PoolError::api(format!(
                    "Failed to add machine pool to hosted cluster '{cluster_key}'"
                )))?;
            (request.name, serde_json::to_value(created)?)
        } else {
            let request = resolver.resolve_machine_pool(input).await?;
            let body = build_machine_pool(&request);
            debug!("Creating machine pool '{}' on cluster '{cluster_key}'", request.name);
            let created = self
                .control_plane
                .create_machine_pool(&cluster.id, &body)
                .await
                .map_err(PoolError::api(format!("Failed to add machine pool to cluster '{cluster_key}'")))?;
            (request.name, serde_json::to_value(created)?)
        };

        if format.is_json() {
            serde_json::to_writer_pretty(&mut *out, &created)?;
            writeln!(out)?;
            return Ok(());
        }
        writeln!(out, "Machine pool '{name}' created successfully on cluster '{cluster_key}'")?;
        writeln!(
            out,
            "To view the machine pool details, run 'poolctl describe {name} --cluster {cluster_key}'"
        )?;
        writeln!(out, "To view all machine pools, run 'poolctl list --cluster {cluster_key}'")?;
        Ok(())
    }

    /// List the pools of a cluster.
    ///
    /// # Errors
    ///
    /// Cluster lookup, API or output failures.
    pub async fn list(&self, cluster_key: &str, format: OutputFormat, out: &mut dyn Write) -> Result<(), PoolError> {
        let cluster = self.fetch_cluster(cluster_key).await?;
        debug!("Loading machine pools for cluster '{cluster_key}'");

        if cluster.is_hosted() {
            let pools = self
                .control_plane
                .list_node_pools(&cluster.id)
                .await
                .map_err(PoolError::api(format!(
                    "Failed to get machine pools for hosted cluster '{cluster_key}'"
                )))?;
            if format.is_json() {
                serde_json::to_writer_pretty(&mut *out, &pools)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{}", node_pools_table(&pools))?;
            }
        } else {
            let pools = self
                .control_plane
                .list_machine_pools(&cluster.id)
                .await
                .map_err(PoolError::api(format!("Failed to get machine pools for cluster '{cluster_key}'")))?;
            if format.is_json() {
                serde_json::to_writer_pretty(&mut *out, &pools)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{}", machine_pools_table(&pools))?;
            }
        }
        Ok(())
    }

    /// Describe one pool. Node pools include their scheduled upgrade.
    ///
    /// # Errors
    ///
    /// Malformed ID, unknown pool, cluster lookup, API or output failures.
    pub async fn describe(
        &self,
        cluster_key: &str,
        pool_id: &str,
        format: OutputFormat,
        out: &mut dyn Write,
    ) -> Result<(), PoolError> {
        if !is_valid_pool_id(pool_id) {
            return Err(PoolError::InvalidPoolId(pool_id.to_string()));
        }
        let cluster = self.fetch_cluster(cluster_key).await?;

        if cluster.is_hosted() {
            debug!("Fetching node pool '{pool_id}' for cluster '{cluster_key}'");
            let pool = self
                .control_plane
                .get_node_pool(&cluster.id, pool_id)
                .await
                .map_err(PoolError::api(format!("Failed to get machine pool '{pool_id}'")))?
                .ok_or_else(|| PoolError::PoolNotFound(pool_id.to_string()))?;
            let upgrade = self
                .control_plane
                .node_pool_upgrade(&cluster.id, pool_id)
                .await
                .map_err(PoolError::api(format!(
                    "Failed to get scheduled upgrades for machine pool '{pool_id}'"
                )))?;

            if format.is_json() {
                serde_json::to_writer_pretty(&mut *out, &node_pool_json(&pool, upgrade.as_ref())?)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", describe_node_pool(&cluster.id, &pool, upgrade.as_ref()))?;
            }
            return Ok(());
        }

        debug!("Fetching machine pool '{pool_id}' for cluster '{cluster_key}'");
        let pool = self
            .control_plane
            .get_machine_pool(&cluster.id, pool_id)
            .await
            .map_err(PoolError::api(format!("Failed to get machine pool '{pool_id}'")))?
            .ok_or_else(|| PoolError::PoolNotFound(pool_id.to_string()))?;
        if format.is_json() {
            serde_json::to_writer_pretty(&mut *out, &pool)?;
            writeln!(out)?;
        } else {
            write!(out, "{}", describe_machine_pool(&cluster.id, &pool))?;
        }
        Ok(())
    }

    /// Delete one pool after confirmation (skipped with `--yes`).
    ///
    /// # Errors
    ///
    /// Malformed ID, unknown pool, cluster lookup, prompt, API or output failures.
    pub async fn delete(
        &self,
        cluster_key: &str,
        pool_id: &str,
        session: Session,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> Result<(), PoolError> {
        if !is_valid_pool_id(pool_id) {
            return Err(PoolError::InvalidPoolId(pool_id.to_string()));
        }
        let cluster = self.fetch_cluster(cluster_key).await?;
        let hosted = cluster.is_hosted();
        let scope = if hosted { "hosted cluster" } else { "cluster" };

        debug!("Loading machine pools for {scope} '{cluster_key}'");
        let exists = if hosted {
            self.control_plane
                .get_node_pool(&cluster.id, pool_id)
                .await
                .map_err(PoolError::api(format!(
                    "Failed to get machine pools for hosted cluster '{cluster_key}'"
                )))?
                .is_some()
        } else {
            self.control_plane
                .list_machine_pools(&cluster.id)
                .await
                .map_err(PoolError::api(format!("Failed to get machine pools for cluster '{cluster_key}'")))?
                .iter()
                .any(|pool| pool.id == pool_id)
        };
        if !exists {
            return Err(if hosted {
                PoolError::NodePoolNotFound {
                    id: pool_id.to_string(),
                    cluster: cluster_key.to_string(),
                }
            } else {
                PoolError::PoolNotFound(pool_id.to_string())
            });
        }

        let action = format!("delete machine pool '{pool_id}' on {scope} '{cluster_key}'");
        let confirmed = session.assume_yes()
            || prompter
                .confirm(&action)
                .map_err(PoolError::prompt("Failed to confirm deletion"))?;
        if !confirmed {
            debug!("Not deleting machine pool '{pool_id}'");
            return Ok(());
        }

        debug!("Deleting machine pool '{pool_id}' on {scope} '{cluster_key}'");
        let deleted = if hosted {
            self.control_plane.delete_node_pool(&cluster.id, pool_id).await
        } else {
            self.control_plane.delete_machine_pool(&cluster.id, pool_id).await
        };
        deleted.map_err(PoolError::api(format!(
            "Failed to delete machine pool '{pool_id}' on {scope} '{cluster_key}'"
        )))?;

        writeln!(out, "Successfully deleted machine pool '{pool_id}' from {scope} '{cluster_key}'")?;
        Ok(())
    }
}
