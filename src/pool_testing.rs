//! In-memory collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::pool_api::{
    InstanceTypeAvailability, InstanceTypeList, MachinePool, NodePool, NodePoolUpgradePolicy, SecurityGroup, Subnet,
};
use crate::pool_client::{ClientError, ControlPlane};
use crate::pool_cloud::CloudProvider;
use crate::pool_model::{Cluster, ClusterVersion, Topology};
use crate::pool_prompt::{PromptError, Prompter, Question, Validator};

// ============================================================================
// Fixtures
// ============================================================================

/// Ready multi-AZ classic cluster, not BYO VPC, version 4.14.5.
pub fn classic_cluster() -> Cluster {
    Cluster {
        id: "2a4b6c8d".into(),
        name: "demo".into(),
        state: "ready".into(),
        topology: Topology::Classic,
        multi_az: true,
        availability_zones: vec!["us-east-1a".into(), "us-east-1b".into(), "us-east-1c".into()],
        subnet_ids: Vec::new(),
        role_arn: None,
        region: "us-east-1".into(),
        version: ClusterVersion {
            raw_id: "4.14.5".into(),
            channel_group: "stable".into(),
        },
        flavour_id: "osd-4".into(),
    }
}

/// Ready hosted cluster in one zone with a BYO VPC, version 4.15.2.
pub fn hosted_cluster() -> Cluster {
    Cluster {
        id: "3f5e7d9c".into(),
        name: "hcp".into(),
        state: "ready".into(),
        topology: Topology::Hosted,
        multi_az: false,
        availability_zones: vec!["us-east-1a".into()],
        subnet_ids: vec!["subnet-private-1a".into(), "subnet-public-1a".into()],
        role_arn: Some("arn:aws:iam::123456789012:role/Installer-Role".into()),
        region: "us-east-1".into(),
        version: ClusterVersion {
            raw_id: "4.15.2".into(),
            channel_group: "stable".into(),
        },
        flavour_id: "osd-4".into(),
    }
}

pub fn subnet(id: &str, zone: &str, public: bool) -> Subnet {
    Subnet {
        subnet_id: id.into(),
        availability_zone: zone.into(),
        public,
    }
}

pub fn instance_types(ids: &[&str]) -> InstanceTypeList {
    InstanceTypeList {
        items: ids
            .iter()
            .map(|id| InstanceTypeAvailability {
                id: (*id).to_string(),
                category: "general_purpose".into(),
                available: true,
            })
            .collect(),
    }
}

// ============================================================================
// Control plane
// ============================================================================

/// Control plane backed by vectors. Every call is recorded by name.
pub struct FakeControlPlane {
    pub clusters: Vec<Cluster>,
    pub machine_pools: Mutex<Vec<MachinePool>>,
    pub node_pools: Mutex<Vec<NodePool>>,
    pub upgrade: Option<NodePoolUpgradePolicy>,
    pub instance_types: InstanceTypeList,
    pub versions: Vec<String>,
    pub tuning_configs: Vec<String>,
    pub kubelet_configs: Vec<String>,
    pub default_disk_gib: Option<u64>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeControlPlane {
    fn default() -> Self {
        Self {
            clusters: vec![classic_cluster(), hosted_cluster()],
            machine_pools: Mutex::default(),
            node_pools: Mutex::default(),
            upgrade: None,
            instance_types: instance_types(&["m5.xlarge", "m5.2xlarge", "r5.xlarge"]),
            versions: vec!["4.13.9".into(), "4.14.0".into(), "4.14.12".into(), "4.15.2".into(), "4.16.0".into()],
            tuning_configs: Vec::new(),
            kubelet_configs: Vec::new(),
            default_disk_gib: Some(300),
            calls: Mutex::default(),
        }
    }
}

impl FakeControlPlane {
    pub fn with_kubelet_configs(names: &[&str]) -> Self {
        Self {
            kubelet_configs: names.iter().map(|n| (*n).to_string()).collect(),
            ..Self::default()
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    /// Names of the calls made so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn find_cluster(&self, key: &str) -> Result<Option<Cluster>, ClientError> {
        self.record("find_cluster");
        Ok(self.clusters.iter().find(|c| c.id == key || c.name == key).cloned())
    }

    async fn list_machine_pools(&self, _cluster_id: &str) -> Result<Vec<MachinePool>, ClientError> {
        self.record("list_machine_pools");
        Ok(self.machine_pools.lock().unwrap().clone())
    }

    async fn get_machine_pool(&self, _cluster_id: &str, pool_id: &str) -> Result<Option<MachinePool>, ClientError> {
        self.record("get_machine_pool");
        Ok(self.machine_pools.lock().unwrap().iter().find(|p| p.id == pool_id).cloned())
    }

    async fn create_machine_pool(&self, _cluster_id: &str, pool: &MachinePool) -> Result<MachinePool, ClientError> {
        self.record("create_machine_pool");
        self.machine_pools.lock().unwrap().push(pool.clone());
        Ok(pool.clone())
    }

    async fn delete_machine_pool(&self, _cluster_id: &str, pool_id: &str) -> Result<(), ClientError> {
        self.record("delete_machine_pool");
        self.machine_pools.lock().unwrap().retain(|p| p.id != pool_id);
        Ok(())
    }

    async fn list_node_pools(&self, _cluster_id: &str) -> Result<Vec<NodePool>, ClientError> {
        self.record("list_node_pools");
        Ok(self.node_pools.lock().unwrap().clone())
    }

    async fn get_node_pool(&self, _cluster_id: &str, pool_id: &str) -> Result<Option<NodePool>, ClientError> {
        self.record("get_node_pool");
        Ok(self.node_pools.lock().unwrap().iter().find(|p| p.id == pool_id).cloned())
    }

    async fn create_node_pool(&self, _cluster_id: &str, pool: &NodePool) -> Result<NodePool, ClientError> {
        self.record("create_node_pool");
        self.node_pools.lock().unwrap().push(pool.clone());
        Ok(pool.clone())
    }

    async fn delete_node_pool(&self, _cluster_id: &str, pool_id: &str) -> Result<(), ClientError> {
        self.record("delete_node_pool");
        self.node_pools.lock().unwrap().retain(|p| p.id != pool_id);
        Ok(())
    }

    async fn node_pool_upgrade(
        &self,
        _cluster_id: &str,
        _pool_id: &str,
    ) -> Result<Option<NodePoolUpgradePolicy>, ClientError> {
        self.record("node_pool_upgrade");
        Ok(self.upgrade.clone())
    }

    async fn default_root_disk_size(&self, _flavour_id: &str) -> Result<Option<u64>, ClientError> {
        self.record("default_root_disk_size");
        Ok(self.default_disk_gib)
    }

    async fn available_instance_types(
        &self,
        _region: &str,
        zones: &[String],
        _role_arn: Option<&str>,
    ) -> Result<InstanceTypeList, ClientError> {
        self.record(&format!("available_instance_types:{}", zones.join(",")));
        Ok(self.instance_types.clone())
    }

    async fn tuning_config_names(&self, _cluster_id: &str) -> Result<Vec<String>, ClientError> {
        self.record("tuning_config_names");
        Ok(self.tuning_configs.clone())
    }

    async fn kubelet_config_names(&self, _cluster_id: &str) -> Result<Vec<String>, ClientError> {
        self.record("kubelet_config_names");
        Ok(self.kubelet_configs.clone())
    }

    async fn versions(&self, _channel_group: &str) -> Result<Vec<String>, ClientError> {
        self.record("versions");
        Ok(self.versions.clone())
    }
}

// ============================================================================
// Cloud
// ============================================================================

#[derive(Default)]
pub struct FakeCloud {
    pub subnets: Vec<Subnet>,
    pub security_groups: Vec<SecurityGroup>,
    pub local_zones: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeCloud {
    pub fn with_subnets(subnets: Vec<Subnet>) -> Self {
        Self {
            subnets,
            ..Self::default()
        }
    }

    pub fn with_local_zones(mut self, zones: &[&str]) -> Self {
        self.local_zones = zones.iter().map(|z| (*z).to_string()).collect();
        self
    }

    pub fn with_security_groups(mut self, ids: &[&str]) -> Self {
        self.security_groups = ids
            .iter()
            .map(|id| SecurityGroup {
                id: (*id).to_string(),
                name: format!("{id}-name"),
            })
            .collect();
        self
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }
}

#[async_trait]
impl CloudProvider for FakeCloud {
    async fn subnet_availability_zone(&self, region: &str, subnet_id: &str) -> Result<String, ClientError> {
        self.record("subnet_availability_zone");
        self.subnets
            .iter()
            .find(|s| s.subnet_id == subnet_id)
            .map(|s| s.availability_zone.clone())
            .ok_or_else(|| ClientError::NotFound(format!("subnet '{subnet_id}' was not found in region '{region}'")))
    }

    async fn vpc_private_subnets(&self, _region: &str, _subnet_id: &str) -> Result<Vec<Subnet>, ClientError> {
        self.record("vpc_private_subnets");
        Ok(self.subnets.iter().filter(|s| !s.public).cloned().collect())
    }

    async fn vpc_security_groups(&self, _region: &str, _subnet_id: &str) -> Result<Vec<SecurityGroup>, ClientError> {
        self.record("vpc_security_groups");
        Ok(self.security_groups.clone())
    }

    async fn is_local_zone(&self, _region: &str, zone: &str) -> Result<bool, ClientError> {
        self.record("is_local_zone");
        Ok(self.local_zones.iter().any(|z| z == zone))
    }
}

// ============================================================================
// Prompter
// ============================================================================

/// Prompter answering from a script keyed by question text.
///
/// Unscripted questions take their default. Every question asked is recorded.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: HashMap<String, VecDeque<String>>,
    confirm_answer: bool,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for `question`.
    pub fn answer(mut self, question: &str, answer: &str) -> Self {
        self.answers
            .entry(question.to_string())
            .or_default()
            .push_back(answer.to_string());
        self
    }

    pub fn confirming(mut self, yes: bool) -> Self {
        self.confirm_answer = yes;
        self
    }

    pub fn was_asked(&self, question: &str) -> bool {
        self.asked.iter().any(|q| q == question)
    }

    fn next(&mut self, question: &Question<'_>) -> Option<String> {
        self.asked.push(question.text.to_string());
        self.answers.get_mut(question.text).and_then(VecDeque::pop_front)
    }
}

impl Prompter for ScriptedPrompter {
    fn input_string(
        &mut self,
        question: &Question<'_>,
        default: &str,
        required: bool,
        validator: Option<Validator<'_>>,
    ) -> Result<String, PromptError> {
        let answer = self
            .next(question)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| default.to_string());
        if required && answer.trim().is_empty() {
            return Err(PromptError::Invalid(format!("'{}' requires an answer", question.text)));
        }
        if let Some(check) = validator
            && !(answer.is_empty() && !required)
        {
            check(&answer).map_err(PromptError::Invalid)?;
        }
        Ok(answer)
    }

    fn input_bool(&mut self, question: &Question<'_>, default: bool) -> Result<bool, PromptError> {
        Ok(self
            .next(question)
            .map_or(default, |a| matches!(a.as_str(), "y" | "yes" | "true")))
    }

    fn select(&mut self, question: &Question<'_>, options: &[String], default: &str) -> Result<String, PromptError> {
        let answer = self.next(question).unwrap_or_else(|| default.to_string());
        if !options.is_empty() && !options.contains(&answer) {
            return Err(PromptError::Invalid(format!("'{answer}' is not one of {}", options.join(", "))));
        }
        Ok(answer)
    }

    fn multi_select(
        &mut self,
        question: &Question<'_>,
        _options: &[String],
        defaults: &[String],
    ) -> Result<Vec<String>, PromptError> {
        Ok(self.next(question).map_or_else(
            || defaults.to_vec(),
            |a| a.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect(),
        ))
    }

    fn confirm(&mut self, action: &str) -> Result<bool, PromptError> {
        self.asked.push(format!("Are you sure you want to {action}?"));
        Ok(self.confirm_answer)
    }
}
