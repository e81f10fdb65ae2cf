//! Wire types of the cluster-management API.
//!
//! Unique responsibility: mirror the JSON bodies exchanged with the control
//! plane and the cloud inquiry endpoints.
//!
//! The same structs are used for create payloads and for responses, so every
//! optional field is skipped when absent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pool_model::{Cluster, ClusterVersion, Topology};

/// `{"items": [...]}` list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemList<T> {
    /// Items; missing means empty.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// `{"id": ...}` reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Referenced ID.
    #[serde(default)]
    pub id: String,
}

/// Node taint as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintSpec {
    /// Key.
    pub key: String,
    /// Value.
    #[serde(default)]
    pub value: String,
    /// `NoSchedule`, `PreferNoSchedule` or `NoExecute`.
    pub effect: String,
}

// ============================================================================
// Machine pools (classic)
// ============================================================================

/// Classic machine pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePool {
    /// Pool name.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<MachinePoolAutoscaling>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<TaintSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub availability_zones: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsMachinePool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<RootVolume>,
}

/// Machine pool autoscaling bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePoolAutoscaling {
    /// Lower bound.
    pub min_replicas: i64,
    /// Upper bound.
    pub max_replicas: i64,
}

/// Cloud-specific machine pool settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsMachinePool {
    /// Present when the pool uses spot instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_market_options: Option<SpotMarketOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_security_group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl AwsMachinePool {
    /// Whether nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spot_market_options.is_none() && self.additional_security_group_ids.is_empty() && self.tags.is_empty()
    }
}

/// Spot market settings. No max price means "capped at on-demand".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotMarketOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

/// Machine pool root volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootVolume {
    /// Cloud volume.
    pub aws: VolumeSize,
}

/// Volume size in GiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSize {
    /// Size in GiB.
    pub size: u64,
}

// ============================================================================
// Node pools (hosted)
// ============================================================================

/// Hosted node pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePool {
    /// Pool name.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<NodePoolAutoscaling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_node_pool: Option<AwsNodePool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<TaintSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_repair: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tuning_configs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubelet_configs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_drain_grace_period: Option<ValueWithUnit>,
    /// Server-side status; never sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodePoolStatus>,
}

/// Node pool autoscaling bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolAutoscaling {
    /// Lower bound.
    pub min_replica: i64,
    /// Upper bound.
    pub max_replica: i64,
}

/// Cloud-specific node pool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsNodePool {
    /// Instance type.
    pub instance_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_security_group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<VolumeSize>,
}

/// Quantity with a unit, e.g. a drain period in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueWithUnit {
    /// Amount.
    pub value: u32,
    /// Unit, e.g. `minutes`.
    pub unit: String,
}

/// Node pool status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolStatus {
    #[serde(default)]
    pub current_replicas: i64,
}

/// Node pool upgrade policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolUpgradePolicy {
    #[serde(default)]
    pub id: String,
    /// Target version.
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<UpgradeState>,
    /// When the upgrade runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

/// Upgrade state, e.g. `scheduled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeState {
    #[serde(default)]
    pub value: String,
}

impl NodePoolUpgradePolicy {
    /// State value, empty when absent.
    #[must_use]
    pub fn state_value(&self) -> &str {
        self.state.as_ref().map_or("", |s| s.value.as_str())
    }

    /// Whether the policy carries enough to describe a scheduled upgrade.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        !self.version.is_empty() && !self.state_value().is_empty()
    }
}

// ============================================================================
// Clusters and catalog
// ============================================================================

/// Cluster as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub multi_az: bool,
    #[serde(default)]
    pub hypershift: Option<HypershiftSettings>,
    #[serde(default)]
    pub nodes: Option<ClusterNodes>,
    #[serde(default)]
    pub aws: Option<ClusterAws>,
    #[serde(default)]
    pub region: Option<ObjectRef>,
    #[serde(default)]
    pub version: Option<VersionRecord>,
    #[serde(default)]
    pub flavour: Option<ObjectRef>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HypershiftSettings {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterNodes {
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterAws {
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub sts: Option<ClusterSts>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSts {
    #[serde(default)]
    pub role_arn: Option<String>,
}

/// Platform version entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(default)]
    pub id: String,
    /// Plain version, e.g. `4.15.2`.
    #[serde(default)]
    pub raw_id: String,
    #[serde(default)]
    pub channel_group: String,
    #[serde(default)]
    pub enabled: bool,
}

impl From<ClusterRecord> for Cluster {
    fn from(record: ClusterRecord) -> Self {
        let topology = if record.hypershift.is_some_and(|h| h.enabled) {
            Topology::Hosted
        } else {
            Topology::Classic
        };
        let (subnet_ids, role_arn) = record
            .aws
            .map(|aws| (aws.subnet_ids, aws.sts.and_then(|sts| sts.role_arn)))
            .unwrap_or_default();
        let version = record.version.unwrap_or_default();

        Self {
            id: record.id,
            name: record.name,
            state: record.state,
            topology,
            multi_az: record.multi_az,
            availability_zones: record.nodes.map(|n| n.availability_zones).unwrap_or_default(),
            subnet_ids,
            role_arn: role_arn.filter(|arn| !arn.is_empty()),
            region: record.region.map(|r| r.id).unwrap_or_default(),
            version: ClusterVersion {
                raw_id: version.raw_id,
                channel_group: if version.channel_group.is_empty() {
                    "stable".to_string()
                } else {
                    version.channel_group
                },
            },
            flavour_id: record.flavour.map(|f| f.id).unwrap_or_default(),
        }
    }
}

/// Cluster flavour, used for platform defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flavour {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub aws: Option<FlavourAws>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlavourAws {
    #[serde(default)]
    pub worker_volume: Option<VolumeSize>,
}

impl Flavour {
    /// Default compute root disk size in GiB.
    #[must_use]
    pub fn default_root_disk_size_gib(&self) -> Option<u64> {
        self.aws
            .as_ref()
            .and_then(|aws| aws.worker_volume)
            .map(|v| v.size)
            .filter(|size| *size > 0)
    }
}

/// Named cluster-scoped config (tuning or kubelet).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// ============================================================================
// Instance types
// ============================================================================

/// Body of the instance type availability inquiry.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceTypeInquiry {
    pub region: ObjectRef,
    pub availability_zones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

/// One instance type and whether it can be used in the requested zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTypeAvailability {
    /// Instance type, e.g. `m5.xlarge`.
    pub id: String,
    /// Category, e.g. `general_purpose`.
    #[serde(default)]
    pub category: String,
    /// Whether it is offered in every requested zone.
    #[serde(default = "available_by_default")]
    pub available: bool,
}

const fn available_by_default() -> bool {
    true
}

/// Instance types returned by the availability inquiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceTypeList {
    /// All returned types, in API order.
    pub items: Vec<InstanceTypeAvailability>,
}

impl InstanceTypeList {
    /// IDs of the types that can be used.
    #[must_use]
    pub fn available_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|t| t.available)
            .map(|t| t.id.clone())
            .collect()
    }

    /// Check `id` is an available type.
    ///
    /// # Errors
    ///
    /// A message naming the valid types.
    pub fn validate(&self, id: &str) -> Result<(), String> {
        if self.items.iter().any(|t| t.available && t.id == id) {
            return Ok(());
        }
        if self.items.iter().any(|t| t.id == id) {
            return Err(format!(
                "instance type '{id}' is not available in the selected availability zones"
            ));
        }
        Err(format!(
            "instance type '{id}' is not supported. Valid instance types: {}",
            self.available_ids().join(", ")
        ))
    }
}

// ============================================================================
// Cloud inquiry
// ============================================================================

/// VPC subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Subnet ID.
    pub subnet_id: String,
    /// Availability zone of the subnet.
    pub availability_zone: String,
    #[serde(default)]
    pub public: bool,
}

/// VPC security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Group ID.
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Availability zone facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInfo {
    #[serde(default)]
    pub name: String,
    /// `availability-zone`, `local-zone` or `wavelength-zone`.
    #[serde(default)]
    pub zone_type: String,
}

impl ZoneInfo {
    /// Whether the zone is a local zone.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.zone_type == "local-zone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_record_maps_topology_and_network() {
        let record: ClusterRecord = serde_json::from_value(serde_json::json!({
            "id": "2a3b",
            "name": "demo",
            "state": "ready",
            "multi_az": true,
            "hypershift": { "enabled": true },
            "nodes": { "availability_zones": ["us-east-1a", "us-east-1b"] },
            "aws": { "subnet_ids": ["subnet-1"], "sts": { "role_arn": "arn:aws:iam::1:role/installer" } },
            "region": { "id": "us-east-1" },
            "version": { "raw_id": "4.15.2", "channel_group": "" },
            "flavour": { "id": "osd-4" }
        }))
        .unwrap();

        let cluster = Cluster::from(record);
        assert_eq!(cluster.topology, Topology::Hosted);
        assert!(cluster.is_byo_vpc());
        assert_eq!(cluster.first_zone(), Some("us-east-1a"));
        assert_eq!(cluster.version.channel_group, "stable");
        assert_eq!(cluster.role_arn.as_deref(), Some("arn:aws:iam::1:role/installer"));
    }

    #[test]
    fn minimal_cluster_record_is_classic() {
        let record: ClusterRecord = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        let cluster = Cluster::from(record);
        assert_eq!(cluster.topology, Topology::Classic);
        assert!(!cluster.is_byo_vpc());
        assert!(cluster.availability_zones.is_empty());
    }

    #[test]
    fn empty_machine_pool_fields_are_not_serialized() {
        let pool = MachinePool {
            id: "mp1".into(),
            replicas: Some(3),
            ..MachinePool::default()
        };
        assert_eq!(
            serde_json::to_value(&pool).unwrap(),
            serde_json::json!({ "id": "mp1", "replicas": 3 })
        );
    }

    #[test]
    fn instance_type_list_validation() {
        let list = InstanceTypeList {
            items: vec![
                InstanceTypeAvailability {
                    id: "m5.xlarge".into(),
                    category: "general_purpose".into(),
                    available: true,
                },
                InstanceTypeAvailability {
                    id: "p4d.24xlarge".into(),
                    category: "accelerated_computing".into(),
                    available: false,
                },
            ],
        };
        assert_eq!(list.available_ids(), vec!["m5.xlarge"]);
        assert!(list.validate("m5.xlarge").is_ok());
        assert!(list.validate("p4d.24xlarge").unwrap_err().contains("not available"));
        assert!(list.validate("t2.nano").unwrap_err().contains("Valid instance types: m5.xlarge"));
    }

    #[test]
    fn upgrade_policy_schedule_detection() {
        let policy: NodePoolUpgradePolicy = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "version": "4.15.3",
            "state": { "value": "scheduled" },
            "next_run": "2026-03-01T10:30:00Z"
        }))
        .unwrap();
        assert!(policy.is_scheduled());
        assert_eq!(policy.state_value(), "scheduled");

        let empty: NodePoolUpgradePolicy = serde_json::from_str(r#"{"version":"4.15.3"}"#).unwrap();
        assert!(!empty.is_scheduled());
    }

    #[test]
    fn flavour_default_disk_size() {
        let flavour: Flavour =
            serde_json::from_str(r#"{"id":"osd-4","aws":{"worker_volume":{"size":300}}}"#).unwrap();
        assert_eq!(flavour.default_root_disk_size_gib(), Some(300));
        assert_eq!(Flavour::default().default_root_disk_size_gib(), None);
    }
}
