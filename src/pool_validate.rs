//! Cross-field and value validation for pool creation.
//!
//! Unique responsibility: decide whether a combination of flags, cluster
//! properties and resolved values is acceptable, and parse user-typed text
//! (labels, taints, tags, disk sizes, drain periods) into typed values.
//!
//! Everything here is pure: no I/O, no prompts, no logging.
//!
//! Flag-compatibility checks are an ordered table of named [`Rule`]s evaluated
//! fail-fast by [`run_rules`]; the resolver calls the value validators again as
//! each field is resolved.

use std::collections::BTreeMap;
use std::num::{IntErrorKind, ParseIntError};
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::pool_model::{
    Cluster, CreationRequest, Flag, ON_DEMAND_PRICE, Placement, PoolInput, Scaling, SpotPricing, Taint,
    TaintEffect,
};

/// Minimum cluster version accepting additional security groups on machine pools.
pub const MIN_CLASSIC_SECURITY_GROUP_VERSION: &str = "4.14.0";

/// Minimum node pool version accepting additional security groups.
pub const MIN_HOSTED_SECURITY_GROUP_VERSION: &str = "4.15.0";

/// Oldest version a new node pool may run.
pub const MIN_HOSTED_POOL_VERSION: &str = "4.14.0";

/// Smallest root disk, in GiB.
pub const MIN_ROOT_DISK_GIB: u64 = 128;

/// Largest root disk for clusters at or above 4.14, in GiB.
pub const MAX_ROOT_DISK_GIB: u64 = 16_384;

/// Largest root disk for clusters below 4.14, in GiB.
pub const LEGACY_MAX_ROOT_DISK_GIB: u64 = 1_024;

/// Longest node drain grace period, in minutes (one week).
pub const MAX_DRAIN_GRACE_PERIOD_MINUTES: u32 = 10_080;

/// Pool identifiers: lowercase, start with a letter, no trailing dash.
#[allow(clippy::expect_used)]
static POOL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("pool name pattern is valid")
});

/// Cluster keys are interpolated into search queries.
#[allow(clippy::expect_used)]
static CLUSTER_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("cluster key pattern is valid"));

// ============================================================================
// Errors
// ============================================================================

/// User-facing validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Flag only valid on multi-AZ clusters.
    #[error("Setting the `{0}` flag is only allowed for multi-AZ clusters")]
    MultiAzClusterOnly(Flag),

    /// `subnet` on a cluster without a customer VPC.
    #[error("Setting the `subnet` flag is only allowed for BYO VPC clusters")]
    SubnetRequiresByoVpc,

    /// Security groups on a cluster without a customer VPC.
    #[error("Setting the `{0}` flag is only allowed for BYOVPC clusters")]
    ByoVpcOnly(Flag),

    /// Flag not available at this platform version.
    #[error("Parameter '{flag}' is not supported prior to version '{minimum}'")]
    UnsupportedBeforeVersion {
        /// Offending flag.
        flag: Flag,
        /// First version accepting the flag.
        minimum: String,
    },

    #[error(
        "Setting both `subnet` and `availability-zone` flag is not supported. Please select `subnet` or \
         `availability-zone` to create a single availability zone machine pool"
    )]
    SubnetAndZone,

    #[error(
        "Setting the `availability-zone` flag is only supported for creating a single AZ machine pool in a \
         multi-AZ cluster"
    )]
    ZoneWithMultiAzPool,

    #[error("Setting the `subnet` flag is only supported for creating a single AZ machine pool")]
    SubnetWithMultiAzPool,

    /// Node pool flag used on a classic cluster.
    #[error("Setting the `{0}` flag is only supported for hosted clusters")]
    HostedClusterOnly(Flag),

    #[error("Expected a valid name for the machine pool")]
    InvalidName,

    #[error("Availability zone '{0}' doesn't belong to the cluster's availability zones")]
    ZoneNotInCluster(String),

    #[error("Replicas can't be set when autoscaling is enabled")]
    ReplicasWithAutoscaling,

    #[error("Autoscaling must be enabled in order to set min and max replicas")]
    BoundsWithoutAutoscaling,

    #[error("min-replicas must be a non-negative integer")]
    NegativeReplicas,

    #[error("min-replicas must be greater than zero.")]
    NodePoolMinReplicasNotPositive,

    #[error("replicas must be a non-negative integer.")]
    NodePoolNegativeReplicas,

    #[error("Multi AZ clusters require that the replicas be a multiple of 3")]
    ReplicasNotMultipleOfThree,

    #[error("max-replicas must be greater or equal to min-replicas")]
    MaxBelowMin,

    #[error("Expected an integer value, got '{0}'")]
    NotAnInteger(String),

    #[error("You must supply a valid instance type")]
    MissingInstanceType,

    #[error("Expected a valid instance type: {0}")]
    InvalidInstanceType(String),

    #[error("Can't set max price when not using spot instances")]
    MaxPriceWithoutSpot,

    #[error("Spot instances are not supported for local zones")]
    SpotInLocalZone,

    #[error("Expected a numeric value for spot max price")]
    NonNumericSpotPrice,

    #[error("Spot max price must be positive")]
    NonPositiveSpotPrice,

    #[error("Failed to find a private subnet for '{0}' availability zone")]
    NoPrivateSubnet(String),

    #[error("Expected key=value format for labels. Got '{0}'")]
    InvalidLabel(String),

    #[error("Duplicated label key '{0}' used")]
    DuplicateLabel(String),

    #[error("Expected key=value:scheduleType format for taints. Got '{0}'")]
    InvalidTaint(String),

    #[error(
        "Invalid taint effect '{0}', only the following effects are supported: 'NoExecute', 'NoSchedule', \
         'PreferNoSchedule'"
    )]
    InvalidTaintEffect(String),

    #[error("Invalid tag format for tag '{0}'. Expected tag format to be 'key:value'")]
    InvalidTag(String),

    /// Root disk size that cannot be parsed.
    #[error("Expected a valid machine pool root disk size value '{value}': {reason}")]
    InvalidDiskSize {
        /// Text as typed.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Root disk size outside the platform bounds.
    #[error("Invalid root disk size: {size} GiB. Must be between {min} GiB and {max} GiB.")]
    DiskSizeOutOfRange {
        /// Requested size.
        size: u64,
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },

    /// Drain grace period that cannot be parsed or is out of range.
    #[error("Expected a valid value for node drain grace period '{value}': {reason}")]
    InvalidDrainPeriod {
        /// Text as typed.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    #[error("Expected a valid OpenShift version: {0}")]
    InvalidVersion(String),

    #[error("Only a single kubelet config is supported for Machine Pools")]
    TooManyKubeletConfigs,

    /// Config name that the cluster does not define.
    #[error("Expected a valid value for {kind}: '{name}' is not one of {available}")]
    UnknownConfig {
        /// `tuning configs` or `kubelet config`.
        kind: &'static str,
        /// Name as typed.
        name: String,
        /// Comma-separated list of valid names.
        available: String,
    },
}

// ============================================================================
// Rule table
// ============================================================================

/// Input to a flag rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Target cluster.
    pub cluster: &'a Cluster,
    /// Raw input with provenance.
    pub input: &'a PoolInput,
}

/// Named cross-field predicate.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable rule name, used in debug logs.
    pub name: &'static str,
    /// Predicate.
    pub check: fn(&RuleContext<'_>) -> Result<(), ValidationError>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Flag rules for classic machine pools, in evaluation order.
pub const CLASSIC_FLAG_RULES: &[Rule] = &[
    Rule {
        name: "multi-availability-zone-requires-multi-az-cluster",
        check: multi_az_flag_requires_multi_az_cluster,
    },
    Rule {
        name: "availability-zone-requires-multi-az-cluster",
        check: zone_flag_requires_multi_az_cluster,
    },
    Rule {
        name: "subnet-requires-byo-vpc",
        check: subnet_requires_byo_vpc,
    },
    Rule {
        name: "security-groups-require-byo-vpc",
        check: security_groups_require_byo_vpc,
    },
    Rule {
        name: "security-groups-require-cluster-version",
        check: security_groups_require_cluster_version,
    },
    Rule {
        name: "subnet-excludes-availability-zone",
        check: subnet_excludes_zone,
    },
    Rule {
        name: "availability-zone-excludes-multi-az-pool",
        check: zone_excludes_multi_az_pool,
    },
    Rule {
        name: "subnet-excludes-multi-az-pool",
        check: subnet_excludes_multi_az_pool,
    },
    Rule {
        name: "hosted-only-flags",
        check: hosted_only_flags,
    },
    Rule {
        name: "scaling-flags-exclusive",
        check: scaling_flags_exclusive,
    },
    Rule {
        name: "max-price-requires-spot",
        check: max_price_requires_spot,
    },
];

/// Flag rules for hosted node pools, in evaluation order.
pub const HOSTED_FLAG_RULES: &[Rule] = &[
    Rule {
        name: "subnet-excludes-availability-zone",
        check: subnet_excludes_zone,
    },
    Rule {
        name: "security-groups-require-pool-version",
        check: security_groups_require_pool_version,
    },
    Rule {
        name: "scaling-flags-exclusive",
        check: scaling_flags_exclusive,
    },
];

/// Evaluate `rules` in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the error of the first failing rule.
pub fn run_rules(rules: &[Rule], ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    rules.iter().try_for_each(|rule| (rule.check)(ctx))
}

fn multi_az_flag_requires_multi_az_cluster(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    if ctx.input.is_set(Flag::MultiAvailabilityZone) && !ctx.cluster.multi_az {
        return Err(ValidationError::MultiAzClusterOnly(Flag::MultiAvailabilityZone));
    }
    Ok(())
}

fn zone_flag_requires_multi_az_cluster(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    if ctx.input.is_set(Flag::AvailabilityZone) && !ctx.cluster.multi_az {
        return Err(ValidationError::MultiAzClusterOnly(Flag::AvailabilityZone));
    }
    Ok(())
}

fn subnet_requires_byo_vpc(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    if ctx.input.is_set(Flag::Subnet) && !ctx.cluster.is_byo_vpc() {
        return Err(ValidationError::SubnetRequiresByoVpc);
    }
    Ok(())
}

fn security_groups_require_byo_vpc(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    if ctx.input.is_set(Flag::SecurityGroupIds) && !ctx.cluster.is_byo_vpc() {
        return Err(ValidationError::ByoVpcOnly(Flag::SecurityGroupIds));
    }
    Ok(())
}

fn security_groups_require_cluster_version(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    if ctx.input.is_set(Flag::SecurityGroupIds) {
        require_security_group_version(&ctx.cluster.version.raw_id, MIN_CLASSIC_SECURITY_GROUP_VERSION)?;
    }
    Ok(())
}

fn security_groups_require_pool_version(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    if !ctx.input.is_set(Flag::SecurityGroupIds) {
        return Ok(());
    }
    let version = if ctx.input.is_set(Flag::Version) && !ctx.input.version.trim().is_empty() {
        ctx.input.version.trim()
    } else {
        ctx.cluster.version.raw_id.as_str()
    };
    require_security_group_version(version, MIN_HOSTED_SECURITY_GROUP_VERSION)
}

/// Fail unless `version` is at least `minimum` for the security group flag.
///
/// # Errors
///
/// Returns [`ValidationError::UnsupportedBeforeVersion`] or an unparsable version error.
pub fn require_security_group_version(version: &str, minimum: &str) -> Result<(), ValidationError> {
    if version_at_least(version, minimum)? {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedBeforeVersion {
            flag: Flag::SecurityGroupIds,
            minimum: minimum.to_string(),
        })
    }
}

fn subnet_excludes_zone(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    if ctx.input.is_set(Flag::Subnet) && ctx.input.is_set(Flag::AvailabilityZone) {
        return Err(ValidationError::SubnetAndZone);
    }
    Ok(())
}

fn zone_excludes_multi_az_pool(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    let input = ctx.input;
    if input.is_set(Flag::AvailabilityZone)
        && input.is_set(Flag::MultiAvailabilityZone)
        && input.multi_availability_zone
    {
        return Err(ValidationError::ZoneWithMultiAzPool);
    }
    Ok(())
}

fn subnet_excludes_multi_az_pool(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    let input = ctx.input;
    if input.is_set(Flag::Subnet) && input.is_set(Flag::MultiAvailabilityZone) && input.multi_availability_zone {
        return Err(ValidationError::SubnetWithMultiAzPool);
    }
    Ok(())
}

fn hosted_only_flags(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    const HOSTED_ONLY: [Flag; 4] = [Flag::Version, Flag::Autorepair, Flag::TuningConfigs, Flag::KubeletConfigs];

    match HOSTED_ONLY.into_iter().find(|flag| ctx.input.is_set(*flag)) {
        Some(flag) => Err(ValidationError::HostedClusterOnly(flag)),
        None => Ok(()),
    }
}

fn scaling_flags_exclusive(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    let input = ctx.input;
    if input.is_set(Flag::EnableAutoscaling) || input.autoscaling {
        check_scaling_exclusivity(input.autoscaling, input)?;
    }
    Ok(())
}

/// Check that the replica flags agree with the chosen scaling mode.
///
/// # Errors
///
/// Autoscaling rejects an explicit `replicas`; fixed scaling rejects explicit bounds.
pub fn check_scaling_exclusivity(autoscaling: bool, input: &PoolInput) -> Result<(), ValidationError> {
    if autoscaling && input.is_set(Flag::Replicas) {
        return Err(ValidationError::ReplicasWithAutoscaling);
    }
    if !autoscaling && (input.is_set(Flag::MinReplicas) || input.is_set(Flag::MaxReplicas)) {
        return Err(ValidationError::BoundsWithoutAutoscaling);
    }
    Ok(())
}

fn max_price_requires_spot(ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
    let input = ctx.input;
    if input.is_set(Flag::SpotMaxPrice) && input.is_set(Flag::UseSpotInstances) && !input.use_spot_instances {
        return Err(ValidationError::MaxPriceWithoutSpot);
    }
    Ok(())
}

// ============================================================================
// Value validators
// ============================================================================

/// Whether `key` can be used to look up a cluster.
#[must_use]
pub fn is_valid_cluster_key(key: &str) -> bool {
    CLUSTER_KEY_RE.is_match(key)
}

/// Whether `id` is a well-formed pool identifier.
#[must_use]
pub fn is_valid_pool_id(id: &str) -> bool {
    POOL_NAME_RE.is_match(id)
}

/// Trim spaces and tabs from a pool name and check it is a valid identifier.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidName`] if the trimmed name does not match.
pub fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim_matches([' ', '\t']);
    if POOL_NAME_RE.is_match(name) {
        Ok(name.to_string())
    } else {
        Err(ValidationError::InvalidName)
    }
}

/// Validate a fixed replica count or an autoscaling lower bound for machine pools.
///
/// # Errors
///
/// Negative values, or values not divisible by three for multi-AZ pools.
pub const fn validate_min_replicas(value: i64, multi_az_pool: bool) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeReplicas);
    }
    if multi_az_pool && value % 3 != 0 {
        return Err(ValidationError::ReplicasNotMultipleOfThree);
    }
    Ok(())
}

/// Validate an autoscaling upper bound for machine pools.
///
/// # Errors
///
/// `max < min`, or not divisible by three for multi-AZ pools.
pub const fn validate_max_replicas(min: i64, max: i64, multi_az_pool: bool) -> Result<(), ValidationError> {
    if min > max {
        return Err(ValidationError::MaxBelowMin);
    }
    if multi_az_pool && max % 3 != 0 {
        return Err(ValidationError::ReplicasNotMultipleOfThree);
    }
    Ok(())
}

/// Validate a node pool replica count (`autoscaling = false`) or lower bound.
///
/// # Errors
///
/// Autoscaling lower bounds must be at least one; fixed counts must not be negative.
pub const fn validate_node_pool_min_replicas(value: i64, autoscaling: bool) -> Result<(), ValidationError> {
    if autoscaling {
        if value < 1 {
            return Err(ValidationError::NodePoolMinReplicasNotPositive);
        }
    } else if value < 0 {
        return Err(ValidationError::NodePoolNegativeReplicas);
    }
    Ok(())
}

/// Validate a node pool autoscaling upper bound.
///
/// # Errors
///
/// Returns [`ValidationError::MaxBelowMin`] when `max < min`.
pub const fn validate_node_pool_max_replicas(min: i64, max: i64) -> Result<(), ValidationError> {
    if min > max {
        return Err(ValidationError::MaxBelowMin);
    }
    Ok(())
}

/// Parse a replica count typed at a prompt.
///
/// # Errors
///
/// Returns [`ValidationError::NotAnInteger`] when the text is not an integer.
pub fn parse_replica_count(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotAnInteger(raw.to_string()))
}

/// Check a spot max price: `on-demand` or a positive number.
///
/// # Errors
///
/// Non-numeric or non-positive prices.
pub fn spot_max_price_validator(raw: &str) -> Result<(), ValidationError> {
    parse_spot_max_price(raw).map(|_| ())
}

/// Parse a spot max price. `on-demand` yields `None`.
///
/// # Errors
///
/// Non-numeric (including NaN and infinities) or non-positive prices.
pub fn parse_spot_max_price(raw: &str) -> Result<Option<f64>, ValidationError> {
    if raw == ON_DEMAND_PRICE {
        return Ok(None);
    }
    let price = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or(ValidationError::NonNumericSpotPrice)?;
    if price <= 0.0 {
        return Err(ValidationError::NonPositiveSpotPrice);
    }
    Ok(Some(price))
}

/// Turn the spot flag and price into a [`SpotPricing`].
///
/// # Errors
///
/// Propagates price parsing errors when spot is enabled.
pub fn spot_pricing(use_spot: bool, raw_price: &str) -> Result<SpotPricing, ValidationError> {
    if !use_spot {
        return Ok(SpotPricing::Disabled);
    }
    Ok(parse_spot_max_price(raw_price)?.map_or(SpotPricing::OnDemandPrice, SpotPricing::MaxPrice))
}

/// Check a kubelet config selection.
///
/// # Errors
///
/// More than one config name.
pub const fn validate_kubelet_configs(names: &[String]) -> Result<(), ValidationError> {
    if names.len() > 1 {
        return Err(ValidationError::TooManyKubeletConfigs);
    }
    Ok(())
}

/// Check every requested config name exists.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownConfig`] for the first unknown name.
pub fn validate_config_names(
    kind: &'static str,
    requested: &[String],
    available: &[String],
) -> Result<(), ValidationError> {
    match requested.iter().find(|name| !available.contains(name)) {
        Some(name) => Err(ValidationError::UnknownConfig {
            kind,
            name: name.clone(),
            available: available.join(", "),
        }),
        None => Ok(()),
    }
}

/// Split a comma-separated list, trimming items and dropping empties.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Parsers
// ============================================================================

/// Parse `key=value,key=value` labels.
///
/// # Errors
///
/// Entries without `=`, empty keys, or duplicated keys.
pub fn parse_labels(raw: &str) -> Result<BTreeMap<String, String>, ValidationError> {
    let mut labels = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = entry
            .split_once('=')
            .filter(|(k, _)| !k.trim().is_empty())
            .ok_or_else(|| ValidationError::InvalidLabel(entry.to_string()))?;
        let key = key.trim().to_string();
        if labels.contains_key(&key) {
            return Err(ValidationError::DuplicateLabel(key));
        }
        labels.insert(key, value.trim().to_string());
    }
    Ok(labels)
}

/// Parse `key=value:Effect,...` taints. The value may be empty.
///
/// # Errors
///
/// Malformed entries or unknown effects.
pub fn parse_taints(raw: &str) -> Result<Vec<Taint>, ValidationError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let invalid = || ValidationError::InvalidTaint(entry.to_string());
            let (key, rest) = entry.split_once('=').ok_or_else(invalid)?;
            let (value, effect) = rest.rsplit_once(':').ok_or_else(invalid)?;
            if key.trim().is_empty() || effect.trim().is_empty() {
                return Err(invalid());
            }
            let effect = TaintEffect::parse(effect.trim())
                .ok_or_else(|| ValidationError::InvalidTaintEffect(effect.trim().to_string()))?;
            Ok(Taint {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
                effect,
            })
        })
        .collect()
}

/// Whether `c` separates a tag key from its value.
#[must_use]
pub const fn is_tag_separator(c: char) -> bool {
    c == '=' || c == ':'
}

/// Split one tag at its first `=` or `:`.
///
/// # Errors
///
/// Tags without a separator or with an empty key.
pub fn split_tag(raw: &str) -> Result<(String, String), ValidationError> {
    let tag = raw.trim();
    let idx = tag
        .find(is_tag_separator)
        .ok_or_else(|| ValidationError::InvalidTag(tag.to_string()))?;
    let (key, value) = (tag[..idx].trim(), tag[idx + 1..].trim());
    if key.is_empty() {
        return Err(ValidationError::InvalidTag(tag.to_string()));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse a list of tags.
///
/// # Errors
///
/// The first malformed tag.
pub fn parse_tags<S: AsRef<str>>(raw: &[S]) -> Result<BTreeMap<String, String>, ValidationError> {
    raw.iter()
        .map(|tag| tag.as_ref())
        .filter(|tag| !tag.trim().is_empty())
        .map(split_tag)
        .collect()
}

/// Parse a disk size such as `256GiB`, `1 TiB` or `500G` into whole GiB.
///
/// Decimal units (`G`, `GB`, `T`, `TB`) are converted from bytes and rounded down.
///
/// # Errors
///
/// Empty input, a missing or unknown unit, a non-numeric amount, or a size past `u64` GiB.
pub fn parse_disk_size_gib(raw: &str) -> Result<u64, ValidationError> {
    const GIB: u128 = 1 << 30;
    const OUT_OF_RANGE: &str = "the size is out of range";

    let invalid = |reason: &str| ValidationError::InvalidDiskSize {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(invalid("a size is required"));
    }
    let split = compact
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| invalid("a unit is required, accepted units are G, GB, Gi, GiB, T, TB, Ti, TiB"))?;
    let (amount, unit) = compact.split_at(split);
    let amount: u128 = amount.parse().map_err(|e: ParseIntError| match e.kind() {
        IntErrorKind::PosOverflow => invalid(OUT_OF_RANGE),
        _ => invalid("the amount must be a whole number"),
    })?;

    let bytes_per_unit: u128 = match unit.to_ascii_lowercase().as_str() {
        "g" | "gb" => 1_000_000_000,
        "gi" | "gib" => GIB,
        "t" | "tb" => 1_000_000_000_000,
        "ti" | "tib" => GIB << 10,
        _ => return Err(invalid("accepted units are G, GB, Gi, GiB, T, TB, Ti, TiB")),
    };

    let gib = amount.saturating_mul(bytes_per_unit) / GIB;
    u64::try_from(gib).map_err(|_| invalid(OUT_OF_RANGE))
}

/// Render a size in GiB the way the disk-size prompt expects it back.
#[must_use]
pub fn format_gib(size: u64) -> String {
    format!("{size} GiB")
}

/// Check a root disk size against the bounds for a cluster version.
///
/// # Errors
///
/// Sizes outside `[128, max]` GiB, where `max` depends on the version.
pub fn validate_root_disk_size(cluster_version: &str, size_gib: u64) -> Result<(), ValidationError> {
    let max = if version_at_least(cluster_version, "4.14.0")? {
        MAX_ROOT_DISK_GIB
    } else {
        LEGACY_MAX_ROOT_DISK_GIB
    };
    if (MIN_ROOT_DISK_GIB..=max).contains(&size_gib) {
        Ok(())
    } else {
        Err(ValidationError::DiskSizeOutOfRange {
            size: size_gib,
            min: MIN_ROOT_DISK_GIB,
            max,
        })
    }
}

/// Parse a node drain grace period: `N`, `N minute(s)` or `N hour(s)`.
///
/// Returns the period in minutes.
///
/// # Errors
///
/// Unknown units, non-numeric amounts, or periods longer than one week.
pub fn parse_node_drain_grace_period(raw: &str) -> Result<u32, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidDrainPeriod {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = raw.split_whitespace();
    let amount = parts.next().ok_or_else(|| invalid("a value is required"))?;
    let unit = parts.next().unwrap_or("minutes");
    if parts.next().is_some() {
        return Err(invalid("expected a number optionally followed by 'minutes' or 'hours'"));
    }

    let amount: u32 = amount
        .parse()
        .map_err(|_| invalid("the amount must be a non-negative integer"))?;
    let minutes = match unit {
        "minute" | "minutes" => amount,
        "hour" | "hours" => amount
            .checked_mul(60)
            .ok_or_else(|| invalid("the period is too long"))?,
        _ => return Err(invalid("only 'minutes' or 'hours' are accepted units")),
    };

    if minutes > MAX_DRAIN_GRACE_PERIOD_MINUTES {
        return Err(invalid("the period cannot exceed 1 week (10080 minutes)"));
    }
    Ok(minutes)
}

// ============================================================================
// Versions
// ============================================================================

/// Parse a platform version, tolerating `openshift-v` prefixes and `major.minor` forms.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidVersion`] for anything else.
pub fn parse_version(raw: &str) -> Result<Version, ValidationError> {
    let trimmed = raw.trim();
    let bare = trimmed
        .strip_prefix("openshift-v")
        .or_else(|| trimmed.strip_prefix('v'))
        .unwrap_or(trimmed);

    Version::parse(bare)
        .or_else(|_| Version::parse(&format!("{bare}.0")))
        .map_err(|_| ValidationError::InvalidVersion(format!("'{raw}' is not a valid version")))
}

fn release(v: &Version) -> (u64, u64, u64) {
    (v.major, v.minor, v.patch)
}

/// `version >= minimum`, comparing major.minor.patch and ignoring pre-release tags.
///
/// # Errors
///
/// Either side fails to parse.
pub fn version_at_least(version: &str, minimum: &str) -> Result<bool, ValidationError> {
    Ok(release(&parse_version(version)?) >= release(&parse_version(minimum)?))
}

/// Oldest version a new node pool may run on a cluster at `cluster_version`:
/// two minors back, never below 4.14.0.
///
/// # Errors
///
/// Unparsable cluster version.
pub fn minimal_hosted_pool_version(cluster_version: &str) -> Result<Version, ValidationError> {
    let cluster = parse_version(cluster_version)?;
    let floor = parse_version(MIN_HOSTED_POOL_VERSION)?;
    let candidate = Version::new(cluster.major, cluster.minor.saturating_sub(2), 0);
    Ok(if release(&candidate) < release(&floor) {
        floor
    } else {
        candidate
    })
}

/// Keep the versions within `[minimum, cluster]`, preserving order. Unparsable entries are dropped.
#[must_use]
pub fn filter_hosted_versions(available: &[String], minimum: &Version, cluster: &Version) -> Vec<String> {
    available
        .iter()
        .filter(|raw| {
            parse_version(raw).is_ok_and(|v| release(&v) >= release(minimum) && release(&v) <= release(cluster))
        })
        .cloned()
        .collect()
}

/// API identifier of a version in a channel group.
#[must_use]
pub fn version_id(raw: &str, channel_group: &str) -> String {
    if channel_group.is_empty() || channel_group == "stable" {
        format!("openshift-v{raw}")
    } else {
        format!("openshift-v{raw}-{channel_group}")
    }
}

// ============================================================================
// Request re-validation
// ============================================================================

/// Re-check every invariant of a resolved request.
///
/// Pure: calling it twice on the same request gives the same answer.
///
/// # Errors
///
/// The first violated invariant.
pub fn validate_request(request: &CreationRequest, cluster: &Cluster) -> Result<(), ValidationError> {
    validate_name(&request.name)?;
    if request.instance_type.trim().is_empty() {
        return Err(ValidationError::MissingInstanceType);
    }

    let hosted = request.hosted.is_some();
    let multi_az_pool = !hosted && request.is_multi_az_pool(cluster);
    match request.scaling {
        Scaling::Fixed { replicas } if hosted => validate_node_pool_min_replicas(replicas, false)?,
        Scaling::Fixed { replicas } => validate_min_replicas(replicas, multi_az_pool)?,
        Scaling::Autoscaled { min, max } if hosted => {
            validate_node_pool_min_replicas(min, true)?;
            validate_node_pool_max_replicas(min, max)?;
        }
        Scaling::Autoscaled { min, max } => {
            validate_min_replicas(min, multi_az_pool)?;
            validate_max_replicas(min, max, multi_az_pool)?;
        }
    }

    if let Placement::SingleAz { zone } = &request.placement
        && !cluster.has_zone(zone)
    {
        return Err(ValidationError::ZoneNotInCluster(zone.clone()));
    }

    if !request.security_group_ids.is_empty() {
        if !cluster.is_byo_vpc() {
            return Err(ValidationError::ByoVpcOnly(Flag::SecurityGroupIds));
        }
        match &request.hosted {
            Some(options) => {
                let version = options.version.as_deref().unwrap_or(&cluster.version.raw_id);
                require_security_group_version(version, MIN_HOSTED_SECURITY_GROUP_VERSION)?;
            }
            None => require_security_group_version(&cluster.version.raw_id, MIN_CLASSIC_SECURITY_GROUP_VERSION)?,
        }
    }

    if let SpotPricing::MaxPrice(price) = request.spot
        && !(price.is_finite() && price > 0.0)
    {
        return Err(ValidationError::NonPositiveSpotPrice);
    }

    if let Some(size) = request.root_disk_size_gib {
        validate_root_disk_size(&cluster.version.raw_id, size)?;
    }

    if let Some(options) = &request.hosted {
        validate_kubelet_configs(&options.kubelet_configs)?;
        if let Some(minutes) = options.node_drain_grace_period_minutes
            && minutes > MAX_DRAIN_GRACE_PERIOD_MINUTES
        {
            return Err(ValidationError::InvalidDrainPeriod {
                value: minutes.to_string(),
                reason: "the period cannot exceed 1 week (10080 minutes)".to_string(),
            });
        }
    }

    Ok(())
}
