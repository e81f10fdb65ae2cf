//! Human and JSON rendering of pools.
//!
//! Unique responsibility: format machine pools and node pools for `list` and
//! `describe`. Nothing here performs I/O; callers write the returned strings.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::pool_api::{MachinePool, NodePool, NodePoolUpgradePolicy, TaintSpec};

/// Output format selected with `--output`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned tables and key/value blocks.
    #[default]
    Text,
    /// Raw JSON.
    Json,
}

impl OutputFormat {
    /// Whether JSON was requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

const DESCRIBE_LABEL_WIDTH: usize = 39;
const NEXT_RUN_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

// ============================================================================
// Tables
// ============================================================================

/// Render rows under headers, columns padded to their widest cell and joined by two spaces.
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.len()).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.len());
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(headers, &widths));
    for row in rows {
        let cells = row.iter().map(String::as_str).collect::<Vec<_>>();
        lines.push(format_row(&cells, &widths));
    }

    lines.join("\n")
}

fn format_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| format!("{:<width$}", cell, width = widths.get(idx).copied().unwrap_or_default()))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// `list` table of classic machine pools.
#[must_use]
pub fn machine_pools_table(pools: &[MachinePool]) -> String {
    let headers = [
        "ID",
        "AUTOSCALING",
        "REPLICAS",
        "INSTANCE TYPE",
        "LABELS",
        "TAINTS",
        "AVAILABILITY ZONES",
        "SUBNETS",
        "SPOT INSTANCES",
        "DISK SIZE",
        "SG IDs",
    ];
    let rows = pools
        .iter()
        .map(|pool| {
            vec![
                pool.id.clone(),
                yes_no(pool.autoscaling.is_some()).to_string(),
                machine_pool_replicas(pool),
                pool.instance_type.clone().unwrap_or_default(),
                format_labels(&pool.labels),
                format_taints(&pool.taints),
                pool.availability_zones.join(", "),
                pool.subnets.join(", "),
                machine_pool_spot(pool),
                machine_pool_disk_size(pool),
                machine_pool_security_groups(pool),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

/// `list` table of hosted node pools.
#[must_use]
pub fn node_pools_table(pools: &[NodePool]) -> String {
    let headers = [
        "ID",
        "AUTOSCALING",
        "REPLICAS",
        "INSTANCE TYPE",
        "LABELS",
        "TAINTS",
        "AVAILABILITY ZONE",
        "SUBNET",
        "VERSION",
        "AUTOREPAIR",
    ];
    let rows = pools
        .iter()
        .map(|pool| {
            vec![
                pool.id.clone(),
                yes_no(pool.autoscaling.is_some()).to_string(),
                format!("{}/{}", node_pool_current_replicas(pool), node_pool_desired_replicas(pool)),
                node_pool_instance_type(pool),
                format_labels(&pool.labels),
                format_taints(&pool.taints),
                pool.availability_zone.clone().unwrap_or_default(),
                pool.subnet.clone().unwrap_or_default(),
                node_pool_version(pool),
                node_pool_autorepair(pool),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

// ============================================================================
// Describe blocks
// ============================================================================

fn describe_block(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(label, value)| {
            let key = format!("{label}:");
            format!("{key:<DESCRIBE_LABEL_WIDTH$}{value}").trim_end().to_string() + "\n"
        })
        .collect()
}

/// `describe` block of a classic machine pool.
#[must_use]
pub fn describe_machine_pool(cluster_id: &str, pool: &MachinePool) -> String {
    describe_block(&[
        ("ID", pool.id.clone()),
        ("Cluster ID", cluster_id.to_string()),
        ("Autoscaling", yes_no(pool.autoscaling.is_some()).to_string()),
        ("Replicas", machine_pool_replicas(pool)),
        ("Instance type", pool.instance_type.clone().unwrap_or_default()),
        ("Labels", format_labels(&pool.labels)),
        ("Taints", format_taints(&pool.taints)),
        ("Availability zones", pool.availability_zones.join(", ")),
        ("Subnets", pool.subnets.join(", ")),
        ("Spot instances", machine_pool_spot(pool)),
        ("Disk size", machine_pool_disk_size(pool)),
        ("Additional Security Group IDs", machine_pool_security_groups(pool)),
        (
            "Tags",
            pool.aws.as_ref().map(|aws| format_tags(&aws.tags)).unwrap_or_default(),
        ),
    ])
}

/// `describe` block of a hosted node pool, with its scheduled upgrade when there is one.
#[must_use]
pub fn describe_node_pool(cluster_id: &str, pool: &NodePool, upgrade: Option<&NodePoolUpgradePolicy>) -> String {
    let aws = pool.aws_node_pool.as_ref();
    let mut out = describe_block(&[
        ("ID", pool.id.clone()),
        ("Cluster ID", cluster_id.to_string()),
        ("Autoscaling", yes_no(pool.autoscaling.is_some()).to_string()),
        ("Desired replicas", node_pool_desired_replicas(pool)),
        ("Current replicas", node_pool_current_replicas(pool)),
        ("Instance type", node_pool_instance_type(pool)),
        ("Labels", format_labels(&pool.labels)),
        ("Tags", aws.map(|a| format_tags(&a.tags)).unwrap_or_default()),
        ("Taints", format_taints(&pool.taints)),
        ("Availability zone", pool.availability_zone.clone().unwrap_or_default()),
        ("Subnet", pool.subnet.clone().unwrap_or_default()),
        ("Version", node_pool_version(pool)),
        ("Autorepair", node_pool_autorepair(pool)),
        ("Tuning configs", pool.tuning_configs.join(", ")),
        ("Kubelet configs", pool.kubelet_configs.join(", ")),
        (
            "Additional security group IDs",
            aws.map(|a| a.additional_security_group_ids.join(", ")).unwrap_or_default(),
        ),
        (
            "Node drain grace period",
            pool.node_drain_grace_period
                .as_ref()
                .map(|p| format!("{} {}", p.value, p.unit))
                .unwrap_or_default(),
        ),
        (
            "Disk size",
            aws.and_then(|a| a.root_volume)
                .map_or_else(|| "default".to_string(), |v| format!("{} GiB", v.size)),
        ),
    ]);

    if let Some(policy) = upgrade.filter(|p| p.is_scheduled()) {
        let next_run = policy
            .next_run
            .map(|at| at.format(NEXT_RUN_FORMAT).to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "{:<DESCRIBE_LABEL_WIDTH$}{} {} on {next_run}\n",
            "Scheduled upgrade:",
            policy.state_value(),
            policy.version,
        ));
    }
    out
}

/// JSON view of a node pool with a `scheduledUpgrade` object when an upgrade is scheduled.
///
/// # Errors
///
/// The pool could not be serialized.
pub fn node_pool_json(pool: &NodePool, upgrade: Option<&NodePoolUpgradePolicy>) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(pool)?;
    if let Some(policy) = upgrade.filter(|p| p.is_scheduled())
        && let Some(object) = value.as_object_mut()
    {
        object.insert(
            "scheduledUpgrade".to_string(),
            json!({
                "version": policy.version,
                "state": policy.state_value(),
                "nextRun": policy.next_run.map(|at| at.format(NEXT_RUN_FORMAT).to_string()),
            }),
        );
    }
    Ok(value)
}

// ============================================================================
// Cell formatting
// ============================================================================

const fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn format_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_tags(tags: &BTreeMap<String, String>) -> String {
    tags.iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_taints(taints: &[TaintSpec]) -> String {
    taints
        .iter()
        .map(|t| format!("{}={}:{}", t.key, t.value, t.effect))
        .collect::<Vec<_>>()
        .join(", ")
}

fn machine_pool_replicas(pool: &MachinePool) -> String {
    match (&pool.autoscaling, pool.replicas) {
        (Some(a), _) => format!("{}-{}", a.min_replicas, a.max_replicas),
        (None, Some(replicas)) => replicas.to_string(),
        (None, None) => String::new(),
    }
}

fn machine_pool_spot(pool: &MachinePool) -> String {
    match pool.aws.as_ref().and_then(|aws| aws.spot_market_options) {
        None => "No".to_string(),
        Some(options) => match options.max_price {
            Some(price) => format!("Yes (max ${price})"),
            None => "Yes (on-demand)".to_string(),
        },
    }
}

fn machine_pool_disk_size(pool: &MachinePool) -> String {
    pool.root_volume
        .map_or_else(|| "default".to_string(), |v| format!("{} GiB", v.aws.size))
}

fn machine_pool_security_groups(pool: &MachinePool) -> String {
    pool.aws
        .as_ref()
        .map(|aws| aws.additional_security_group_ids.join(", "))
        .unwrap_or_default()
}

fn node_pool_desired_replicas(pool: &NodePool) -> String {
    match (&pool.autoscaling, pool.replicas) {
        (Some(a), _) => format!("{}-{}", a.min_replica, a.max_replica),
        (None, Some(replicas)) => replicas.to_string(),
        (None, None) => String::new(),
    }
}

fn node_pool_current_replicas(pool: &NodePool) -> String {
    pool.status
        .map(|s| s.current_replicas)
        .unwrap_or_default()
        .to_string()
}

fn node_pool_instance_type(pool: &NodePool) -> String {
    pool.aws_node_pool
        .as_ref()
        .map(|aws| aws.instance_type.clone())
        .unwrap_or_default()
}

fn node_pool_version(pool: &NodePool) -> String {
    pool.version
        .as_ref()
        .map(|v| v.id.trim_start_matches("openshift-v").to_string())
        .unwrap_or_default()
}

fn node_pool_autorepair(pool: &NodePool) -> String {
    yes_no(pool.auto_repair.unwrap_or_default()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool_api::{
        AwsMachinePool, AwsNodePool, MachinePoolAutoscaling, NodePoolStatus, ObjectRef, SpotMarketOptions,
        UpgradeState, VolumeSize,
    };
    use chrono::{TimeZone, Utc};

    fn machine_pool() -> MachinePool {
        MachinePool {
            id: "np".into(),
            instance_type: Some("m5.xlarge".into()),
            replicas: Some(8),
            subnets: vec!["sn1".into(), "sn2".into()],
            taints: vec![TaintSpec {
                key: "taint".into(),
                value: "test".into(),
                effect: "NoSchedule".into(),
            }],
            ..MachinePool::default()
        }
    }

    fn node_pool() -> NodePool {
        NodePool {
            id: "np".into(),
            replicas: Some(8),
            availability_zone: Some("az".into()),
            subnet: Some("sn".into()),
            version: Some(ObjectRef {
                id: "openshift-v4.15.2".into(),
            }),
            auto_repair: Some(false),
            aws_node_pool: Some(AwsNodePool {
                instance_type: "m5.xlarge".into(),
                ..AwsNodePool::default()
            }),
            status: Some(NodePoolStatus { current_replicas: 6 }),
            ..NodePool::default()
        }
    }

    fn upgrade() -> NodePoolUpgradePolicy {
        NodePoolUpgradePolicy {
            id: "test-policy".into(),
            version: "4.15.3".into(),
            state: Some(UpgradeState {
                value: "scheduled".into(),
            }),
            next_run: Some(Utc.with_ymd_and_hms(2024, 4, 2, 6, 2, 0).unwrap()),
        }
    }

    #[test]
    fn table_pads_columns_to_widest_cell() {
        let out = render_table(&["ID", "NAME"], &[vec!["a".into(), "longer".into()], vec!["bbb".into(), "x".into()]]);
        assert_eq!(out, "ID   NAME\na    longer\nbbb  x");
    }

    #[test]
    fn machine_pools_table_rows() {
        let out = machine_pools_table(&[machine_pool()]);
        let mut lines = out.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("ID  AUTOSCALING  REPLICAS  INSTANCE TYPE"));
        assert!(header.ends_with("SG IDs"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("np  No"));
        assert!(row.contains("taint=test:NoSchedule"));
        assert!(row.contains("sn1, sn2"));
        assert!(row.contains("default"));
    }

    #[test]
    fn node_pools_table_shows_current_over_desired() {
        let out = node_pools_table(&[node_pool()]);
        let row = out.lines().nth(1).unwrap();
        assert!(row.contains("6/8"));
        assert!(row.contains("4.15.2"));
        assert!(row.ends_with("No"));
    }

    #[test]
    fn machine_pool_describe_aligns_values() {
        let mut pool = machine_pool();
        pool.autoscaling = Some(MachinePoolAutoscaling {
            min_replicas: 3,
            max_replicas: 6,
        });
        pool.aws = Some(AwsMachinePool {
            spot_market_options: Some(SpotMarketOptions { max_price: Some(0.5) }),
            ..AwsMachinePool::default()
        });
        let out = describe_machine_pool("c1", &pool);
        assert!(out.starts_with("ID:                                    np\n"));
        assert!(out.contains("Cluster ID:                            c1\n"));
        assert!(out.contains("Autoscaling:                           Yes\n"));
        assert!(out.contains("Replicas:                              3-6\n"));
        assert!(out.contains("Spot instances:                        Yes (max $0.5)\n"));
        assert!(out.contains("Labels:\n"));
    }

    #[test]
    fn node_pool_describe_appends_scheduled_upgrade() {
        let policy = upgrade();
        let out = describe_node_pool("c1", &node_pool(), Some(&policy));
        assert!(out.ends_with("Scheduled upgrade:                     scheduled 4.15.3 on 2024-04-02 06:02 UTC\n"));

        let plain = describe_node_pool("c1", &node_pool(), None);
        assert!(!plain.contains("Scheduled upgrade"));
        assert!(plain.contains("Current replicas:                      6\n"));
    }

    #[test]
    fn node_pool_json_adds_scheduled_upgrade() {
        let mut pool = node_pool();
        pool.aws_node_pool = Some(AwsNodePool {
            instance_type: "m5.xlarge".into(),
            root_volume: Some(VolumeSize { size: 300 }),
            ..AwsNodePool::default()
        });
        let value = node_pool_json(&pool, Some(&upgrade())).unwrap();
        assert_eq!(value["id"], "np");
        assert_eq!(
            value["scheduledUpgrade"],
            json!({"version": "4.15.3", "state": "scheduled", "nextRun": "2024-04-02 06:02 UTC"})
        );

        let unscheduled = NodePoolUpgradePolicy {
            state: None,
            ..upgrade()
        };
        let value = node_pool_json(&pool, Some(&unscheduled)).unwrap();
        assert!(value.get("scheduledUpgrade").is_none());
    }
}
