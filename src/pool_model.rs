//! Machine pool domain model.
//!
//! Unique responsibility: describe the cluster a pool is created on, the raw
//! user input (with per-flag provenance) and the fully-resolved creation request.
//!
//! Nothing in here talks to the network or the terminal; values flow in from
//! `pool_cli` / `pool_client` and out through `pool_resolver` and `pool_builder`.

use std::collections::BTreeMap;
use std::fmt;

/// Instance type offered by default on the command line.
pub const DEFAULT_INSTANCE_TYPE: &str = "m5.xlarge";

/// Spot price keyword meaning "cap at the on-demand price".
pub const ON_DEMAND_PRICE: &str = "on-demand";

// ============================================================================
// Cluster
// ============================================================================

/// Control-plane topology of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Classic clusters own their control plane; pools are "machine pools".
    Classic,
    /// Hosted control plane clusters; pools are "node pools".
    Hosted,
}

/// Platform version of a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterVersion {
    /// Raw version, e.g. `4.14.5`.
    pub raw_id: String,
    /// Channel group, e.g. `stable` or `candidate`.
    pub channel_group: String,
}

/// Read-only view of the cluster a pool is created on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Cluster ID.
    pub id: String,
    /// Cluster name.
    pub name: String,
    /// Lifecycle state as reported by the API (`ready`, `installing`, ...).
    pub state: String,
    /// Control-plane topology.
    pub topology: Topology,
    /// Whether the cluster spans several availability zones.
    pub multi_az: bool,
    /// Availability zones of the cluster's compute nodes, in cluster order.
    pub availability_zones: Vec<String>,
    /// Subnets supplied at install time. Non-empty means BYO VPC.
    pub subnet_ids: Vec<String>,
    /// STS installer role, if the cluster uses STS.
    pub role_arn: Option<String>,
    /// Cloud region.
    pub region: String,
    /// Platform version.
    pub version: ClusterVersion,
    /// Flavour used to look up platform defaults (root disk size).
    pub flavour_id: String,
}

impl Cluster {
    /// Whether the cluster was installed into a customer-provided VPC.
    #[must_use]
    pub fn is_byo_vpc(&self) -> bool {
        !self.subnet_ids.is_empty()
    }

    /// Whether the cluster runs a hosted control plane.
    #[must_use]
    pub fn is_hosted(&self) -> bool {
        self.topology == Topology::Hosted
    }

    /// Whether the cluster accepts pool changes.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.eq_ignore_ascii_case("ready")
    }

    /// First availability zone of the cluster, used as the prompt default.
    #[must_use]
    pub fn first_zone(&self) -> Option<&str> {
        self.availability_zones.first().map(String::as_str)
    }

    /// Whether `zone` is one of the cluster's availability zones.
    #[must_use]
    pub fn has_zone(&self, zone: &str) -> bool {
        self.availability_zones.iter().any(|z| z == zone)
    }
}

// ============================================================================
// Flag provenance
// ============================================================================

/// Every user-settable input of `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    /// `--name`
    Name,
    /// `--instance-type`
    InstanceType,
    /// `--replicas`
    Replicas,
    /// `--enable-autoscaling`
    EnableAutoscaling,
    /// `--min-replicas`
    MinReplicas,
    /// `--max-replicas`
    MaxReplicas,
    /// `--labels`
    Labels,
    /// `--taints`
    Taints,
    /// `--use-spot-instances`
    UseSpotInstances,
    /// `--spot-max-price`
    SpotMaxPrice,
    /// `--multi-availability-zone`
    MultiAvailabilityZone,
    /// `--availability-zone`
    AvailabilityZone,
    /// `--subnet`
    Subnet,
    /// `--version`
    Version,
    /// `--autorepair`
    Autorepair,
    /// `--tuning-configs`
    TuningConfigs,
    /// `--kubelet-configs`
    KubeletConfigs,
    /// `--disk-size`
    DiskSize,
    /// `--additional-security-group-ids`
    SecurityGroupIds,
    /// `--tags`
    Tags,
    /// `--node-drain-grace-period`
    NodeDrainGracePeriod,
}

impl Flag {
    /// All flags, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::Name,
        Self::InstanceType,
        Self::Replicas,
        Self::EnableAutoscaling,
        Self::MinReplicas,
        Self::MaxReplicas,
        Self::Labels,
        Self::Taints,
        Self::UseSpotInstances,
        Self::SpotMaxPrice,
        Self::MultiAvailabilityZone,
        Self::AvailabilityZone,
        Self::Subnet,
        Self::Version,
        Self::Autorepair,
        Self::TuningConfigs,
        Self::KubeletConfigs,
        Self::DiskSize,
        Self::SecurityGroupIds,
        Self::Tags,
        Self::NodeDrainGracePeriod,
    ];

    /// Long flag name as typed on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::InstanceType => "instance-type",
            Self::Replicas => "replicas",
            Self::EnableAutoscaling => "enable-autoscaling",
            Self::MinReplicas => "min-replicas",
            Self::MaxReplicas => "max-replicas",
            Self::Labels => "labels",
            Self::Taints => "taints",
            Self::UseSpotInstances => "use-spot-instances",
            Self::SpotMaxPrice => "spot-max-price",
            Self::MultiAvailabilityZone => "multi-availability-zone",
            Self::AvailabilityZone => "availability-zone",
            Self::Subnet => "subnet",
            Self::Version => "version",
            Self::Autorepair => "autorepair",
            Self::TuningConfigs => "tuning-configs",
            Self::KubeletConfigs => "kubelet-configs",
            Self::DiskSize => "disk-size",
            Self::SecurityGroupIds => "additional-security-group-ids",
            Self::Tags => "tags",
            Self::NodeDrainGracePeriod => "node-drain-grace-period",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a flag value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Provenance {
    /// Never supplied and no default declared.
    #[default]
    Unset,
    /// The declared default of the flag.
    Default,
    /// Given on the command line or through the environment.
    Explicit,
}

/// Provenance of every `create` flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    sources: BTreeMap<Flag, Provenance>,
}

impl FlagSet {
    /// Empty set: every flag is `Unset`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FlagSet::record`].
    #[must_use]
    pub fn with(mut self, flag: Flag, provenance: Provenance) -> Self {
        self.record(flag, provenance);
        self
    }

    /// Builder shorthand marking several flags explicit.
    #[must_use]
    pub fn explicit(mut self, flags: &[Flag]) -> Self {
        for flag in flags {
            self.record(*flag, Provenance::Explicit);
        }
        self
    }

    /// Record the provenance of a flag.
    pub fn record(&mut self, flag: Flag, provenance: Provenance) {
        if provenance == Provenance::Unset {
            self.sources.remove(&flag);
        } else {
            self.sources.insert(flag, provenance);
        }
    }

    /// Provenance of a flag.
    #[must_use]
    pub fn provenance(&self, flag: Flag) -> Provenance {
        self.sources.get(&flag).copied().unwrap_or_default()
    }

    /// Whether the user set the flag.
    #[must_use]
    pub fn is_explicit(&self, flag: Flag) -> bool {
        self.provenance(flag) == Provenance::Explicit
    }
}

// ============================================================================
// Raw input
// ============================================================================

/// Raw `create` input: flag values plus their provenance.
///
/// String-typed fields hold what the user typed; parsing happens in the resolver
/// so errors carry the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolInput {
    /// Pool name.
    pub name: String,
    /// Instance type.
    pub instance_type: String,
    /// Fixed replica count.
    pub replicas: i64,
    /// Whether autoscaling is enabled.
    pub autoscaling: bool,
    /// Autoscaling lower bound.
    pub min_replicas: i64,
    /// Autoscaling upper bound.
    pub max_replicas: i64,
    /// Labels, `key=value,...`.
    pub labels: String,
    /// Taints, `key=value:Effect,...`.
    pub taints: String,
    /// Whether spot instances are requested.
    pub use_spot_instances: bool,
    /// Spot max price, a positive number or `on-demand`.
    pub spot_max_price: String,
    /// Whether the pool spans every cluster zone.
    pub multi_availability_zone: bool,
    /// Single availability zone.
    pub availability_zone: String,
    /// Single subnet.
    pub subnet: String,
    /// Hosted: `OpenShift` version.
    pub version: String,
    /// Hosted: automatic node repair.
    pub autorepair: bool,
    /// Hosted: tuning configs, comma separated.
    pub tuning_configs: String,
    /// Hosted: kubelet configs, comma separated.
    pub kubelet_configs: String,
    /// Root disk size, e.g. `256GiB`.
    pub disk_size: String,
    /// Additional security groups.
    pub security_group_ids: Vec<String>,
    /// Cloud resource tags, `key:value` each.
    pub tags: Vec<String>,
    /// Hosted: node drain grace period, e.g. `30 minutes`.
    pub node_drain_grace_period: String,
    /// Provenance of each field above.
    pub flags: FlagSet,
}

impl Default for PoolInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            replicas: 0,
            autoscaling: false,
            min_replicas: 0,
            max_replicas: 0,
            labels: String::new(),
            taints: String::new(),
            use_spot_instances: false,
            spot_max_price: ON_DEMAND_PRICE.to_string(),
            multi_availability_zone: true,
            availability_zone: String::new(),
            subnet: String::new(),
            version: String::new(),
            autorepair: true,
            tuning_configs: String::new(),
            kubelet_configs: String::new(),
            disk_size: String::new(),
            security_group_ids: Vec::new(),
            tags: Vec::new(),
            node_drain_grace_period: String::new(),
            flags: FlagSet::new(),
        }
    }
}

impl PoolInput {
    /// Whether the user set `flag`.
    #[must_use]
    pub fn is_set(&self, flag: Flag) -> bool {
        self.flags.is_explicit(flag)
    }
}

// ============================================================================
// Session capability
// ============================================================================

/// Per-invocation interaction settings, threaded through every resolver step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    interactive: bool,
    assume_yes: bool,
}

impl Session {
    /// New session.
    #[must_use]
    pub const fn new(interactive: bool, assume_yes: bool) -> Self {
        Self {
            interactive,
            assume_yes,
        }
    }

    /// Whether prompts are shown for values that already have a flag value.
    #[must_use]
    pub const fn is_interactive(self) -> bool {
        self.interactive
    }

    /// Whether confirmations are answered "yes" without asking.
    #[must_use]
    pub const fn assume_yes(self) -> bool {
        self.assume_yes
    }

    /// Promote the session to interactive.
    pub const fn enable_interactive(&mut self) {
        self.interactive = true;
    }
}

// ============================================================================
// Resolved request
// ============================================================================

/// Scaling policy. Exactly one variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    /// Fixed node count.
    Fixed {
        /// Node count.
        replicas: i64,
    },
    /// Autoscaled between bounds.
    Autoscaled {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
}

/// Where the pool's nodes are placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Every availability zone of the cluster.
    MultiAz,
    /// One availability zone of a multi-AZ cluster.
    SingleAz {
        /// Availability zone.
        zone: String,
    },
    /// One subnet of a BYO VPC cluster.
    SingleSubnet {
        /// Subnet ID.
        subnet: String,
    },
}

impl Placement {
    /// Chosen availability zone, if any.
    #[must_use]
    pub fn zone(&self) -> Option<&str> {
        match self {
            Self::SingleAz { zone } => Some(zone),
            _ => None,
        }
    }

    /// Chosen subnet, if any.
    #[must_use]
    pub fn subnet(&self) -> Option<&str> {
        match self {
            Self::SingleSubnet { subnet } => Some(subnet),
            _ => None,
        }
    }
}

/// Spot market choice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpotPricing {
    /// On-demand instances.
    Disabled,
    /// Spot instances capped at the on-demand price.
    OnDemandPrice,
    /// Spot instances capped at the given hourly price.
    MaxPrice(f64),
}

/// Scheduling effect of a taint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaintEffect {
    /// `NoSchedule`
    NoSchedule,
    /// `PreferNoSchedule`
    PreferNoSchedule,
    /// `NoExecute`
    NoExecute,
}

impl TaintEffect {
    /// Parse the Kubernetes spelling of an effect.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "NoSchedule" => Some(Self::NoSchedule),
            "PreferNoSchedule" => Some(Self::PreferNoSchedule),
            "NoExecute" => Some(Self::NoExecute),
            _ => None,
        }
    }

    /// Kubernetes spelling of the effect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSchedule => "NoSchedule",
            Self::PreferNoSchedule => "PreferNoSchedule",
            Self::NoExecute => "NoExecute",
        }
    }
}

impl fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node taint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taint {
    /// Taint key.
    pub key: String,
    /// Taint value (may be empty).
    pub value: String,
    /// Scheduling effect.
    pub effect: TaintEffect,
}

/// Fields that only exist on hosted node pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedOptions {
    /// Raw `OpenShift` version of the pool, when one was chosen.
    pub version: Option<String>,
    /// Automatic node repair.
    pub autorepair: bool,
    /// Tuning config names.
    pub tuning_configs: Vec<String>,
    /// Kubelet config names (at most one).
    pub kubelet_configs: Vec<String>,
    /// Node drain grace period in minutes.
    pub node_drain_grace_period_minutes: Option<u32>,
}

/// Fully-resolved pool creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationRequest {
    /// Pool name.
    pub name: String,
    /// Instance type.
    pub instance_type: String,
    /// Scaling policy.
    pub scaling: Scaling,
    /// Node placement.
    pub placement: Placement,
    /// Spot market choice.
    pub spot: SpotPricing,
    /// Additional security groups.
    pub security_group_ids: Vec<String>,
    /// Root disk size in GiB, when the user picked one.
    pub root_disk_size_gib: Option<u64>,
    /// Platform default root disk size observed while resolving.
    pub default_root_disk_size_gib: Option<u64>,
    /// Node labels.
    pub labels: BTreeMap<String, String>,
    /// Node taints.
    pub taints: Vec<Taint>,
    /// Cloud resource tags.
    pub tags: BTreeMap<String, String>,
    /// Hosted-only options; `None` for classic machine pools.
    pub hosted: Option<HostedOptions>,
    /// Provenance of the input the request was resolved from.
    pub provenance: FlagSet,
}

impl CreationRequest {
    /// Whether the pool spreads over all zones of a multi-AZ cluster.
    #[must_use]
    pub fn is_multi_az_pool(&self, cluster: &Cluster) -> bool {
        cluster.multi_az && self.placement == Placement::MultiAz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_set_tracks_three_states() {
        let flags = FlagSet::new()
            .with(Flag::Replicas, Provenance::Default)
            .with(Flag::Subnet, Provenance::Explicit);

        assert_eq!(flags.provenance(Flag::Name), Provenance::Unset);
        assert_eq!(flags.provenance(Flag::Replicas), Provenance::Default);
        assert!(!flags.is_explicit(Flag::Replicas));
        assert!(flags.is_explicit(Flag::Subnet));
    }

    #[test]
    fn recording_unset_clears_previous_provenance() {
        let mut flags = FlagSet::new().explicit(&[Flag::Tags]);
        flags.record(Flag::Tags, Provenance::Unset);
        assert_eq!(flags, FlagSet::new());
    }

    #[test]
    fn session_promotion_is_sticky() {
        let mut session = Session::new(false, true);
        assert!(!session.is_interactive());
        session.enable_interactive();
        assert!(session.is_interactive());
        assert!(session.assume_yes());
    }

    #[test]
    fn flag_names_are_kebab_case() {
        for flag in Flag::ALL {
            assert!(
                flag.name()
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c == '-'),
                "{flag:?}"
            );
        }
        assert_eq!(Flag::SecurityGroupIds.to_string(), "additional-security-group-ids");
    }

    #[test]
    fn placement_exposes_at_most_one_target() {
        let az = Placement::SingleAz { zone: "us-east-1a".into() };
        assert_eq!(az.zone(), Some("us-east-1a"));
        assert_eq!(az.subnet(), None);
        assert_eq!(Placement::MultiAz.zone(), None);
    }
}
