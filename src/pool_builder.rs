//! Create payloads.
//!
//! Unique responsibility: map a resolved [`CreationRequest`] onto the wire
//! body of a machine pool or node pool.

use crate::pool_api::{
    AwsMachinePool, AwsNodePool, MachinePool, MachinePoolAutoscaling, NodePool, NodePoolAutoscaling, ObjectRef,
    RootVolume, SpotMarketOptions, TaintSpec, ValueWithUnit, VolumeSize,
};
use crate::pool_model::{Cluster, CreationRequest, Scaling, SpotPricing, Taint};
use crate::pool_validate::version_id;

/// Unit sent with the node drain grace period.
pub const DRAIN_GRACE_PERIOD_UNIT: &str = "minutes";

/// Classic machine pool body.
#[must_use]
pub fn build_machine_pool(request: &CreationRequest) -> MachinePool {
    let mut pool = MachinePool {
        id: request.name.clone(),
        instance_type: Some(request.instance_type.clone()),
        labels: request.labels.clone(),
        taints: taint_specs(&request.taints),
        ..MachinePool::default()
    };

    match request.scaling {
        Scaling::Fixed { replicas } => pool.replicas = Some(replicas),
        Scaling::Autoscaled { min, max } => {
            pool.autoscaling = Some(MachinePoolAutoscaling {
                min_replicas: min,
                max_replicas: max,
            });
        }
    }

    if let Some(zone) = request.placement.zone() {
        pool.availability_zones = vec![zone.to_string()];
    }
    if let Some(subnet) = request.placement.subnet() {
        pool.subnets = vec![subnet.to_string()];
    }

    let aws = AwsMachinePool {
        spot_market_options: match request.spot {
            SpotPricing::Disabled => None,
            SpotPricing::OnDemandPrice => Some(SpotMarketOptions::default()),
            SpotPricing::MaxPrice(price) => Some(SpotMarketOptions { max_price: Some(price) }),
        },
        additional_security_group_ids: request.security_group_ids.clone(),
        tags: request.tags.clone(),
    };
    if !aws.is_empty() {
        pool.aws = Some(aws);
    }

    pool.root_volume = root_volume_size(request).map(|size| RootVolume {
        aws: VolumeSize { size },
    });
    pool
}

/// Hosted node pool body. The version is sent as an ID in the cluster's channel group.
#[must_use]
pub fn build_node_pool(request: &CreationRequest, cluster: &Cluster) -> NodePool {
    let mut pool = NodePool {
        id: request.name.clone(),
        subnet: request.placement.subnet().map(str::to_string),
        aws_node_pool: Some(AwsNodePool {
            instance_type: request.instance_type.clone(),
            additional_security_group_ids: request.security_group_ids.clone(),
            tags: request.tags.clone(),
            root_volume: root_volume_size(request).map(|size| VolumeSize { size }),
        }),
        labels: request.labels.clone(),
        taints: taint_specs(&request.taints),
        ..NodePool::default()
    };

    match request.scaling {
        Scaling::Fixed { replicas } => pool.replicas = Some(replicas),
        Scaling::Autoscaled { min, max } => {
            pool.autoscaling = Some(NodePoolAutoscaling {
                min_replica: min,
                max_replica: max,
            });
        }
    }

    if let Some(options) = &request.hosted {
        pool.version = options.version.as_deref().map(|raw| ObjectRef {
            id: version_id(raw, &cluster.version.channel_group),
        });
        pool.auto_repair = Some(options.autorepair);
        pool.tuning_configs.clone_from(&options.tuning_configs);
        pool.kubelet_configs.clone_from(&options.kubelet_configs);
        pool.node_drain_grace_period = options
            .node_drain_grace_period_minutes
            .map(|value| ValueWithUnit {
                value,
                unit: DRAIN_GRACE_PERIOD_UNIT.to_string(),
            });
    }
    pool
}

/// Chosen root disk size, unless it matches the platform default.
fn root_volume_size(request: &CreationRequest) -> Option<u64> {
    request
        .root_disk_size_gib
        .filter(|size| request.default_root_disk_size_gib != Some(*size))
}

fn taint_specs(taints: &[Taint]) -> Vec<TaintSpec> {
    taints
        .iter()
        .map(|t| TaintSpec {
            key: t.key.clone(),
            value: t.value.clone(),
            effect: t.effect.as_str().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool_model::{FlagSet, HostedOptions, Placement, TaintEffect};
    use crate::pool_testing::{classic_cluster, hosted_cluster};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn request() -> CreationRequest {
        CreationRequest {
            name: "mp1".into(),
            instance_type: "m5.xlarge".into(),
            scaling: Scaling::Fixed { replicas: 3 },
            placement: Placement::MultiAz,
            spot: SpotPricing::Disabled,
            security_group_ids: Vec::new(),
            root_disk_size_gib: None,
            default_root_disk_size_gib: None,
            labels: BTreeMap::new(),
            taints: Vec::new(),
            tags: BTreeMap::new(),
            hosted: None,
            provenance: FlagSet::new(),
        }
    }

    #[test]
    fn minimal_machine_pool_sends_only_what_was_chosen() {
        let body = serde_json::to_value(build_machine_pool(&request())).unwrap();
        assert_eq!(
            body,
            json!({"id": "mp1", "instance_type": "m5.xlarge", "replicas": 3})
        );
    }

    #[test]
    fn machine_pool_carries_placement_spot_and_disk() {
        let mut req = request();
        req.scaling = Scaling::Autoscaled { min: 1, max: 4 };
        req.placement = Placement::SingleSubnet {
            subnet: "subnet-a".into(),
        };
        req.spot = SpotPricing::MaxPrice(0.5);
        req.taints = vec![Taint {
            key: "dedicated".into(),
            value: "gpu".into(),
            effect: TaintEffect::NoSchedule,
        }];
        req.root_disk_size_gib = Some(512);
        req.default_root_disk_size_gib = Some(300);

        let body = serde_json::to_value(build_machine_pool(&req)).unwrap();
        assert_eq!(body["autoscaling"], json!({"min_replicas": 1, "max_replicas": 4}));
        assert!(body.get("replicas").is_none());
        assert_eq!(body["subnets"], json!(["subnet-a"]));
        assert!(body.get("availability_zones").is_none());
        assert_eq!(body["aws"]["spot_market_options"], json!({"max_price": 0.5}));
        assert_eq!(body["root_volume"], json!({"aws": {"size": 512}}));
        assert_eq!(
            body["taints"],
            json!([{"key": "dedicated", "value": "gpu", "effect": "NoSchedule"}])
        );
    }

    #[test]
    fn on_demand_spot_sends_empty_market_options() {
        let mut req = request();
        req.spot = SpotPricing::OnDemandPrice;
        req.placement = Placement::SingleAz {
            zone: "us-east-1b".into(),
        };
        let body = serde_json::to_value(build_machine_pool(&req)).unwrap();
        assert_eq!(body["aws"], json!({"spot_market_options": {}}));
        assert_eq!(body["availability_zones"], json!(["us-east-1b"]));
    }

    #[test]
    fn default_disk_size_is_omitted() {
        let mut req = request();
        req.root_disk_size_gib = Some(300);
        req.default_root_disk_size_gib = Some(300);
        assert!(build_machine_pool(&req).root_volume.is_none());
    }

    #[test]
    fn node_pool_uses_channel_version_id_and_drain_unit() {
        let mut cluster = hosted_cluster();
        cluster.version.channel_group = "candidate".into();

        let mut req = request();
        req.scaling = Scaling::Autoscaled { min: 2, max: 5 };
        req.placement = Placement::SingleSubnet {
            subnet: "subnet-private-1a".into(),
        };
        req.hosted = Some(HostedOptions {
            version: Some("4.15.2".into()),
            autorepair: false,
            tuning_configs: vec!["tuned-1".into()],
            kubelet_configs: Vec::new(),
            node_drain_grace_period_minutes: Some(60),
        });

        let body = serde_json::to_value(build_node_pool(&req, &cluster)).unwrap();
        assert_eq!(body["version"], json!({"id": "openshift-v4.15.2-candidate"}));
        assert_eq!(body["subnet"], json!("subnet-private-1a"));
        assert_eq!(body["autoscaling"], json!({"min_replica": 2, "max_replica": 5}));
        assert_eq!(body["auto_repair"], json!(false));
        assert_eq!(body["tuning_configs"], json!(["tuned-1"]));
        assert_eq!(
            body["node_drain_grace_period"],
            json!({"value": 60, "unit": "minutes"})
        );
        assert_eq!(body["aws_node_pool"], json!({"instance_type": "m5.xlarge"}));
        assert!(body.get("kubelet_configs").is_none());
        assert!(body.get("status").is_none());
    }

    #[test]
    fn classic_request_never_builds_hosted_fields() {
        let body = serde_json::to_value(build_node_pool(&request(), &classic_cluster())).unwrap();
        assert!(body.get("version").is_none());
        assert!(body.get("auto_repair").is_none());
    }
}
