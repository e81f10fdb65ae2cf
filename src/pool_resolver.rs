//! Input resolution.
//!
//! Unique responsibility: turn raw `create` input into a validated
//! [`CreationRequest`], asking the user for whatever is missing.
//!
//! Steps run in a fixed order and later steps see earlier choices: the
//! instance type lookup is filtered by the placement, the security group
//! prompt is gated on the pool version. A missing name, or an availability
//! zone backed by several subnets, promotes the session to interactive for
//! every remaining step.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::pool_api::Subnet;
use crate::pool_cloud::CloudProvider;
use crate::pool_client::ControlPlane;
use crate::pool_error::PoolError;
use crate::pool_model::{
    Cluster, CreationRequest, Flag, HostedOptions, Placement, PoolInput, Scaling, Session, SpotPricing, Taint,
};
use crate::pool_prompt::{Prompter, Question};
use crate::pool_validate::{
    CLASSIC_FLAG_RULES, HOSTED_FLAG_RULES, MIN_CLASSIC_SECURITY_GROUP_VERSION, MIN_HOSTED_SECURITY_GROUP_VERSION,
    Rule, RuleContext, ValidationError, check_scaling_exclusivity, filter_hosted_versions, format_gib,
    minimal_hosted_pool_version, parse_disk_size_gib, parse_labels, parse_node_drain_grace_period, parse_tags,
    parse_taints, parse_version, run_rules, split_list, spot_max_price_validator, spot_pricing, validate_config_names,
    validate_kubelet_configs, validate_max_replicas, validate_min_replicas, validate_name,
    validate_node_pool_max_replicas, validate_node_pool_min_replicas, validate_request, validate_root_disk_size,
    version_at_least,
};

const NAME_HELP: &str = "Name for the machine pool (required).";
const MULTI_AZ_HELP: &str = "Whether the machine pool spans every availability zone of the cluster.";
const ZONE_HELP: &str = "Availability zone of a single-AZ machine pool.";
const SELECT_SUBNET_HELP: &str = "Place the machine pool in one private subnet of the cluster's VPC.";
const SUBNET_HELP: &str = "Private subnet to place the machine pool in.";
const AUTOSCALING_HELP: &str = "Scale the machine pool between a minimum and a maximum number of nodes.";
const MIN_REPLICAS_HELP: &str =
    "Minimum number of machines. Multi-AZ machine pools need a multiple of the number of zones.";
const MAX_REPLICAS_HELP: &str =
    "Maximum number of machines. Multi-AZ machine pools need a multiple of the number of zones.";
const REPLICAS_HELP: &str = "Number of machines. Multi-AZ machine pools need a multiple of the number of zones.";
const SECURITY_GROUPS_HELP: &str = "Additional security groups attached to the machine pool nodes.";
const INSTANCE_TYPE_HELP: &str = "Instance type of the machine pool nodes.";
const LABELS_HELP: &str = "Labels for the machine pool, as key=value pairs separated by commas.";
const TAINTS_HELP: &str = "Taints for the machine pool, as key=value:Effect entries separated by commas.";
const USE_SPOT_HELP: &str = "Use spot instances for the machine pool.";
const SPOT_PRICE_HELP: &str = "Max hourly price for a spot instance, or 'on-demand' to cap at the on-demand price.";
const TAGS_HELP: &str = "Cloud resource tags, as key:value pairs separated by commas.";
const DISK_SIZE_HELP: &str = "Root disk size, e.g. '300GiB' or '1TiB'.";
const VERSION_HELP: &str = "OpenShift version of the node pool.";
const AUTOREPAIR_HELP: &str = "Automatically repair unhealthy nodes.";
const TUNING_HELP: &str = "Tuning configs applied to the node pool.";
const KUBELET_HELP: &str = "Kubelet config applied to the node pool (at most one).";
const DRAIN_HELP: &str = "Time to wait for pods to drain before replacing a node, e.g. '30 minutes' or '1 hour'.";

/// Which named config list is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigKind {
    Tuning,
    Kubelet,
}

impl ConfigKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Tuning => "tuning configs",
            Self::Kubelet => "kubelet config",
        }
    }

    const fn question(self) -> Question<'static> {
        match self {
            Self::Tuning => Question::new("Tuning configs", TUNING_HELP),
            Self::Kubelet => Question::new("Kubelet config", KUBELET_HELP),
        }
    }
}

/// Resolves `create` input against one cluster.
pub struct Resolver<'a> {
    control_plane: &'a dyn ControlPlane,
    cloud: &'a dyn CloudProvider,
    prompter: &'a mut dyn Prompter,
    cluster: &'a Cluster,
    session: Session,
}

impl<'a> Resolver<'a> {
    /// New resolver for `cluster`.
    pub fn new(
        control_plane: &'a dyn ControlPlane,
        cloud: &'a dyn CloudProvider,
        prompter: &'a mut dyn Prompter,
        cluster: &'a Cluster,
        session: Session,
    ) -> Self {
        Self {
            control_plane,
            cloud,
            prompter,
            cluster,
            session,
        }
    }

    /// Current session, including any promotion to interactive.
    #[must_use]
    pub const fn session(&self) -> Session {
        self.session
    }

    /// Resolve a classic machine pool.
    ///
    /// # Errors
    ///
    /// Flag conflicts, invalid answers, prompt failures and API failures.
    pub async fn resolve_machine_pool(&mut self, input: &PoolInput) -> Result<CreationRequest, PoolError> {
        let cluster = self.cluster;
        check_rules(CLASSIC_FLAG_RULES, cluster, input)?;

        let name = self.resolve_name(input)?;
        let placement = self.resolve_classic_placement(input).await?;
        let multi_az_pool = cluster.multi_az && placement == Placement::MultiAz;
        let scaling = self.resolve_scaling(input, false, multi_az_pool)?;

        let groups_supported = version_at_least(&cluster.version.raw_id, MIN_CLASSIC_SECURITY_GROUP_VERSION)?;
        let security_group_ids = self.resolve_security_groups(input, groups_supported).await?;

        let zones = self.availability_zone_filter(&placement).await?;
        let instance_type = self.resolve_instance_type(input, &name, &zones).await?;
        let labels = self.resolve_labels(input)?;
        let taints = self.resolve_taints(input)?;
        let spot = self.resolve_spot(input, &placement, &zones).await?;
        let tags = self.resolve_tags(input)?;
        let (root_disk_size_gib, default_root_disk_size_gib) = self.resolve_root_disk(input).await?;

        let request = CreationRequest {
            name,
            instance_type,
            scaling,
            placement,
            spot,
            security_group_ids,
            root_disk_size_gib,
            default_root_disk_size_gib,
            labels,
            taints,
            tags,
            hosted: None,
            provenance: input.flags.clone(),
        };
        validate_request(&request, cluster)?;
        Ok(request)
    }

    /// Resolve a hosted node pool.
    ///
    /// # Errors
    ///
    /// Flag conflicts, invalid answers, prompt failures and API failures.
    pub async fn resolve_node_pool(&mut self, input: &PoolInput) -> Result<CreationRequest, PoolError> {
        let cluster = self.cluster;
        check_rules(HOSTED_FLAG_RULES, cluster, input)?;

        let name = self.resolve_name(input)?;
        let version = self.resolve_version(input).await?;
        let placement = self.resolve_hosted_placement(input).await?;
        let scaling = self.resolve_scaling(input, true, false)?;

        let pool_version = version.as_deref().unwrap_or(&cluster.version.raw_id);
        let groups_supported = version_at_least(pool_version, MIN_HOSTED_SECURITY_GROUP_VERSION)?;
        let security_group_ids = self.resolve_security_groups(input, groups_supported).await?;

        let zones = self.availability_zone_filter(&placement).await?;
        let instance_type = self.resolve_instance_type(input, &name, &zones).await?;
        let labels = self.resolve_labels(input)?;
        let taints = self.resolve_taints(input)?;
        let tags = self.resolve_tags(input)?;
        let (root_disk_size_gib, default_root_disk_size_gib) = self.resolve_root_disk(input).await?;

        let autorepair = self.resolve_autorepair(input)?;
        let tuning_configs = self.resolve_configs(ConfigKind::Tuning, &input.tuning_configs).await?;
        let kubelet_configs = self.resolve_configs(ConfigKind::Kubelet, &input.kubelet_configs).await?;
        let node_drain_grace_period_minutes = self.resolve_drain_grace_period(input)?;

        let request = CreationRequest {
            name,
            instance_type,
            scaling,
            placement,
            spot: SpotPricing::Disabled,
            security_group_ids,
            root_disk_size_gib,
            default_root_disk_size_gib,
            labels,
            taints,
            tags,
            hosted: Some(HostedOptions {
                version,
                autorepair,
                tuning_configs,
                kubelet_configs,
                node_drain_grace_period_minutes,
            }),
            provenance: input.flags.clone(),
        };
        validate_request(&request, cluster)?;
        Ok(request)
    }

    /// Zones the instance type lookup is restricted to.
    ///
    /// A single zone yields that zone, a subnet yields the subnet's zone, a
    /// multi-AZ pool yields every cluster zone in cluster order.
    ///
    /// # Errors
    ///
    /// The subnet's zone could not be looked up.
    pub async fn availability_zone_filter(&self, placement: &Placement) -> Result<Vec<String>, PoolError> {
        let cluster = self.cluster;
        match placement {
            Placement::SingleAz { zone } => Ok(vec![zone.clone()]),
            Placement::SingleSubnet { subnet } => {
                let zone = self
                    .cloud
                    .subnet_availability_zone(&cluster.region, subnet)
                    .await
                    .map_err(PoolError::api(format!(
                        "Failed to get the availability zone of subnet '{subnet}'"
                    )))?;
                Ok(vec![zone])
            }
            Placement::MultiAz => Ok(cluster.availability_zones.clone()),
        }
    }

    // ========================================================================
    // Name
    // ========================================================================

    fn resolve_name(&mut self, input: &PoolInput) -> Result<String, PoolError> {
        let mut name = input.name.trim_matches([' ', '\t']).to_string();
        if name.is_empty() && !self.session.is_interactive() {
            info!("Enabling interactive mode");
            self.session.enable_interactive();
        }
        if self.session.is_interactive() {
            let check = |raw: &str| validate_name(raw).map(|_| ()).map_err(|e| e.to_string());
            name = self
                .prompter
                .input_string(&Question::new("Machine pool name", NAME_HELP), &name, true, Some(&check))
                .map_err(PoolError::prompt("Expected a valid name for the machine pool"))?;
        }
        Ok(validate_name(&name)?)
    }

    // ========================================================================
    // Placement
    // ========================================================================

    async fn resolve_classic_placement(&mut self, input: &PoolInput) -> Result<Placement, PoolError> {
        let cluster = self.cluster;
        let mut subnet = None;

        if !cluster.multi_az && cluster.is_byo_vpc() {
            subnet = self.subnet_from_user(input).await?;
        }

        if cluster.multi_az {
            let single_target = input.is_set(Flag::AvailabilityZone) || input.is_set(Flag::Subnet);
            let mut multi_az_pool = !single_target && input.multi_availability_zone;
            if !single_target
                && !input.is_set(Flag::MultiAvailabilityZone)
                && self.session.is_interactive()
                && !self.session.assume_yes()
            {
                multi_az_pool = self
                    .prompter
                    .input_bool(
                        &Question::new("Create multi-AZ machine pool", MULTI_AZ_HELP),
                        multi_az_pool,
                    )
                    .map_err(PoolError::prompt("Expected a valid value for multi-availability-zone"))?;
            }
            if multi_az_pool {
                return Ok(Placement::MultiAz);
            }

            if cluster.is_byo_vpc() && input.availability_zone.trim().is_empty() {
                subnet = self.subnet_from_user(input).await?;
            }
            if subnet.is_none() {
                let zone = self.select_cluster_zone(input)?;
                return Ok(Placement::SingleAz { zone });
            }
        }

        Ok(subnet.map_or(Placement::MultiAz, |subnet| Placement::SingleSubnet { subnet }))
    }

    async fn resolve_hosted_placement(&mut self, input: &PoolInput) -> Result<Placement, PoolError> {
        let subnet = match self.subnet_from_user(input).await? {
            Some(subnet) => subnet,
            None => self.subnet_from_zone(input).await?,
        };
        Ok(Placement::SingleSubnet { subnet })
    }

    fn select_cluster_zone(&mut self, input: &PoolInput) -> Result<String, PoolError> {
        let cluster = self.cluster;
        let mut zone = cluster.first_zone().unwrap_or_default().to_string();

        if input.is_set(Flag::AvailabilityZone) {
            zone = input.availability_zone.trim().to_string();
        } else if self.session.is_interactive() {
            zone = self
                .prompter
                .select(
                    &Question::new("AWS availability zone", ZONE_HELP),
                    &cluster.availability_zones,
                    &zone,
                )
                .map_err(PoolError::prompt("Expected a valid AWS availability zone"))?;
        }

        if !cluster.has_zone(&zone) {
            return Err(ValidationError::ZoneNotInCluster(zone).into());
        }
        Ok(zone)
    }

    /// Explicit subnet, or one picked from the VPC's private subnets.
    async fn subnet_from_user(&mut self, input: &PoolInput) -> Result<Option<String>, PoolError> {
        if input.is_set(Flag::Subnet) {
            let subnet = input.subnet.trim();
            return Ok((!subnet.is_empty()).then(|| subnet.to_string()));
        }
        if !self.session.is_interactive() {
            return Ok(None);
        }

        let wanted = self
            .prompter
            .input_bool(
                &Question::new("Select subnet for a single AZ machine pool", SELECT_SUBNET_HELP),
                false,
            )
            .map_err(PoolError::prompt("Expected a valid value for select single subnet"))?;
        if !wanted {
            return Ok(None);
        }

        let options: Vec<String> = self
            .private_subnets()
            .await?
            .into_iter()
            .map(|s| s.subnet_id)
            .collect();
        let Some(default) = options.first().cloned() else {
            warn!("No private subnets found in the VPC of cluster '{}'", self.cluster.id);
            return Ok(None);
        };

        let subnet = self
            .prompter
            .select(&Question::new("Subnet ID", SUBNET_HELP), &options, &default)
            .map_err(PoolError::prompt("Expected a valid subnet"))?;
        Ok(Some(subnet))
    }

    /// Private subnet of the chosen zone. Several candidates make the session interactive.
    async fn subnet_from_zone(&mut self, input: &PoolInput) -> Result<String, PoolError> {
        let cluster = self.cluster;

        let mut by_zone: Vec<(String, Vec<String>)> = Vec::new();
        for subnet in self.private_subnets().await? {
            match by_zone.iter_mut().find(|(zone, _)| *zone == subnet.availability_zone) {
                Some((_, ids)) => ids.push(subnet.subnet_id),
                None => by_zone.push((subnet.availability_zone, vec![subnet.subnet_id])),
            }
        }
        let zones: Vec<String> = by_zone.iter().map(|(zone, _)| zone.clone()).collect();

        let mut zone = cluster
            .first_zone()
            .map(str::to_string)
            .or_else(|| zones.first().cloned())
            .unwrap_or_default();
        if input.is_set(Flag::AvailabilityZone) {
            zone = input.availability_zone.trim().to_string();
        } else if self.session.is_interactive() && !zones.is_empty() {
            zone = self
                .prompter
                .select(&Question::new("AWS availability zone", ZONE_HELP), &zones, &zone)
                .map_err(PoolError::prompt("Expected a valid AWS availability zone"))?;
        }

        let Some((_, ids)) = by_zone.iter().find(|(candidate, _)| *candidate == zone) else {
            return Err(ValidationError::NoPrivateSubnet(zone).into());
        };
        match ids.as_slice() {
            [only] => Ok(only.clone()),
            _ => {
                info!("There are several subnets for availability zone '{zone}'");
                self.session.enable_interactive();
                let default = ids.first().cloned().unwrap_or_default();
                self.prompter
                    .select(&Question::new("Subnet ID", SUBNET_HELP), ids, &default)
                    .map_err(PoolError::prompt("Expected a valid subnet"))
            }
        }
    }

    async fn private_subnets(&self) -> Result<Vec<Subnet>, PoolError> {
        let cluster = self.cluster;
        let Some(anchor) = cluster.subnet_ids.first() else {
            return Ok(Vec::new());
        };
        self.cloud
            .vpc_private_subnets(&cluster.region, anchor)
            .await
            .map_err(PoolError::api(format!(
                "Failed to get the VPC subnets of cluster '{}'",
                cluster.id
            )))
    }

    // ========================================================================
    // Scaling
    // ========================================================================

    fn resolve_scaling(&mut self, input: &PoolInput, hosted: bool, multi_az_pool: bool) -> Result<Scaling, PoolError> {
        let mut autoscaling = input.autoscaling;
        if !autoscaling
            && !input.is_set(Flag::Replicas)
            && !input.is_set(Flag::EnableAutoscaling)
            && self.session.is_interactive()
        {
            autoscaling = self
                .prompter
                .input_bool(&Question::new("Enable autoscaling", AUTOSCALING_HELP), autoscaling)
                .map_err(PoolError::prompt("Expected a valid value for enable-autoscaling"))?;
        }
        check_scaling_exclusivity(autoscaling, input)?;

        let interactive = self.session.is_interactive();
        if autoscaling {
            let mut min = input.min_replicas;
            if interactive || !input.is_set(Flag::MinReplicas) {
                let check = |n: i64| replica_floor(n, hosted, true, multi_az_pool).map_err(|e| e.to_string());
                min = self
                    .prompter
                    .input_int(&Question::new("Min replicas", MIN_REPLICAS_HELP), min, &check)
                    .map_err(PoolError::prompt("Expected a valid number of min replicas"))?;
            }
            replica_floor(min, hosted, true, multi_az_pool)?;

            let mut max = input.max_replicas;
            if interactive || !input.is_set(Flag::MaxReplicas) {
                let check = |n: i64| replica_ceiling(min, n, hosted, multi_az_pool).map_err(|e| e.to_string());
                max = self
                    .prompter
                    .input_int(&Question::new("Max replicas", MAX_REPLICAS_HELP), max, &check)
                    .map_err(PoolError::prompt("Expected a valid number of max replicas"))?;
            }
            replica_ceiling(min, max, hosted, multi_az_pool)?;

            debug!("Autoscaling between {min} and {max} replicas");
            return Ok(Scaling::Autoscaled { min, max });
        }

        let mut replicas = input.replicas;
        if interactive || !input.is_set(Flag::Replicas) {
            let check = |n: i64| replica_floor(n, hosted, false, multi_az_pool).map_err(|e| e.to_string());
            replicas = self
                .prompter
                .input_int(&Question::new("Replicas", REPLICAS_HELP), replicas, &check)
                .map_err(PoolError::prompt("Expected a valid number of replicas"))?;
        }
        replica_floor(replicas, hosted, false, multi_az_pool)?;
        Ok(Scaling::Fixed { replicas })
    }

    // ========================================================================
    // Networking and instance type
    // ========================================================================

    async fn resolve_security_groups(&mut self, input: &PoolInput, supported: bool) -> Result<Vec<String>, PoolError> {
        let cluster = self.cluster;
        let mut ids: Vec<String> = input
            .security_group_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if supported
            && !input.is_set(Flag::SecurityGroupIds)
            && self.session.is_interactive()
            && let Some(anchor) = cluster.subnet_ids.first()
        {
            let options: Vec<String> = self
                .cloud
                .vpc_security_groups(&cluster.region, anchor)
                .await
                .map_err(PoolError::api(format!(
                    "Failed to get the security groups of cluster '{}'",
                    cluster.id
                )))?
                .into_iter()
                .map(|group| group.id)
                .collect();
            if !options.is_empty() {
                ids = self
                    .prompter
                    .multi_select(
                        &Question::new("Additional Security Group IDs", SECURITY_GROUPS_HELP),
                        &options,
                        &ids,
                    )
                    .map_err(PoolError::prompt("Expected valid security group IDs"))?;
            }
        }
        Ok(ids)
    }

    async fn resolve_instance_type(
        &mut self,
        input: &PoolInput,
        name: &str,
        zones: &[String],
    ) -> Result<String, PoolError> {
        let cluster = self.cluster;
        let mut instance_type = input.instance_type.trim().to_string();
        if instance_type.is_empty() && !self.session.is_interactive() {
            return Err(ValidationError::MissingInstanceType.into());
        }

        info!("Checking available instance types for machine pool '{name}'");
        let available = self
            .control_plane
            .available_instance_types(&cluster.region, zones, cluster.role_arn.as_deref())
            .await
            .map_err(PoolError::api("Failed to fetch instance types"))?;

        if self.session.is_interactive() {
            let options = available.available_ids();
            if instance_type.is_empty() {
                instance_type = options.first().cloned().unwrap_or_default();
            }
            instance_type = self
                .prompter
                .select(&Question::new("Instance type", INSTANCE_TYPE_HELP), &options, &instance_type)
                .map_err(PoolError::prompt("Expected a valid instance type"))?;
        }

        available
            .validate(&instance_type)
            .map_err(ValidationError::InvalidInstanceType)?;
        Ok(instance_type)
    }

    // ========================================================================
    // Labels, taints, spot, tags, disk
    // ========================================================================

    fn resolve_labels(&mut self, input: &PoolInput) -> Result<BTreeMap<String, String>, PoolError> {
        let mut raw = input.labels.clone();
        if self.session.is_interactive() {
            let check = |s: &str| parse_labels(s).map(|_| ()).map_err(|e| e.to_string());
            raw = self
                .prompter
                .input_string(&Question::new("Labels", LABELS_HELP), &raw, false, Some(&check))
                .map_err(PoolError::prompt("Expected a valid comma-separated list of attributes"))?;
        }
        Ok(parse_labels(&raw)?)
    }

    fn resolve_taints(&mut self, input: &PoolInput) -> Result<Vec<Taint>, PoolError> {
        let mut raw = input.taints.clone();
        if self.session.is_interactive() {
            let check = |s: &str| parse_taints(s).map(|_| ()).map_err(|e| e.to_string());
            raw = self
                .prompter
                .input_string(&Question::new("Taints", TAINTS_HELP), &raw, false, Some(&check))
                .map_err(PoolError::prompt("Expected a valid comma-separated list of taints"))?;
        }
        Ok(parse_taints(&raw)?)
    }

    async fn resolve_spot(
        &mut self,
        input: &PoolInput,
        placement: &Placement,
        zones: &[String],
    ) -> Result<SpotPricing, PoolError> {
        let cluster = self.cluster;
        let spot_set = input.is_set(Flag::UseSpotInstances);
        let price_set = input.is_set(Flag::SpotMaxPrice);
        let mut use_spot = input.use_spot_instances;
        let mut price = input.spot_max_price.trim().to_string();

        let local_zone = match (placement, zones.first()) {
            (Placement::SingleSubnet { .. }, Some(zone)) => self
                .cloud
                .is_local_zone(&cluster.region, zone)
                .await
                .map_err(PoolError::api(format!("Failed to get the type of availability zone '{zone}'")))?,
            _ => false,
        };
        if local_zone && use_spot {
            return Err(ValidationError::SpotInLocalZone.into());
        }

        if !local_zone && !spot_set && !price_set && self.session.is_interactive() {
            use_spot = self
                .prompter
                .input_bool(&Question::new("Use spot instances", USE_SPOT_HELP), use_spot)
                .map_err(PoolError::prompt("Expected a valid value for use spot instances"))?;
        }

        if use_spot && !price_set && self.session.is_interactive() {
            let check = |s: &str| spot_max_price_validator(s).map_err(|e| e.to_string());
            price = self
                .prompter
                .input_string(
                    &Question::new("Spot instance max price", SPOT_PRICE_HELP),
                    &price,
                    false,
                    Some(&check),
                )
                .map_err(PoolError::prompt("Expected a valid spot max price"))?;
        }

        if price_set && !use_spot {
            return Err(ValidationError::MaxPriceWithoutSpot.into());
        }
        Ok(spot_pricing(use_spot, &price)?)
    }

    fn resolve_tags(&mut self, input: &PoolInput) -> Result<BTreeMap<String, String>, PoolError> {
        let mut tags = input.tags.clone();
        if self.session.is_interactive() {
            let check = |s: &str| parse_tags(&split_list(s)).map(|_| ()).map_err(|e| e.to_string());
            let raw = self
                .prompter
                .input_string(&Question::new("Tags", TAGS_HELP), &tags.join(","), false, Some(&check))
                .map_err(PoolError::prompt("Expected a valid set of tags"))?;
            tags = split_list(&raw);
        }
        Ok(parse_tags(&tags)?)
    }

    /// Chosen root disk size and the platform default, both in GiB.
    async fn resolve_root_disk(&mut self, input: &PoolInput) -> Result<(Option<u64>, Option<u64>), PoolError> {
        let cluster = self.cluster;
        let given = input.disk_size.trim();
        if given.is_empty() && !self.session.is_interactive() {
            return Ok((None, None));
        }

        let default = match self.control_plane.default_root_disk_size(&cluster.flavour_id).await {
            Ok(size) => size,
            Err(e) => {
                warn!("Unable to fetch the default root disk size: {e}");
                None
            }
        };

        let mut raw = if given.is_empty() {
            default.map(format_gib).unwrap_or_default()
        } else {
            given.to_string()
        };
        if self.session.is_interactive() {
            let version = cluster.version.raw_id.as_str();
            let check = |s: &str| {
                parse_disk_size_gib(s)
                    .and_then(|size| validate_root_disk_size(version, size))
                    .map_err(|e| e.to_string())
            };
            raw = self
                .prompter
                .input_string(
                    &Question::new("Root disk size (GiB or TiB)", DISK_SIZE_HELP),
                    &raw,
                    false,
                    Some(&check),
                )
                .map_err(PoolError::prompt("Expected a valid machine pool root disk size value"))?;
        }
        if raw.trim().is_empty() {
            return Ok((None, default));
        }

        let size = parse_disk_size_gib(&raw)?;
        validate_root_disk_size(&cluster.version.raw_id, size)?;
        Ok((Some(size), default))
    }

    // ========================================================================
    // Hosted-only options
    // ========================================================================

    async fn resolve_version(&mut self, input: &PoolInput) -> Result<Option<String>, PoolError> {
        if !input.is_set(Flag::Version) && !self.session.is_interactive() {
            return Ok(None);
        }
        let cluster = self.cluster;
        let cluster_version = cluster.version.raw_id.as_str();

        let available = self
            .control_plane
            .versions(&cluster.version.channel_group)
            .await
            .map_err(PoolError::api("Failed to fetch OpenShift versions"))?;
        let minimum = minimal_hosted_pool_version(cluster_version)?;
        let options = filter_hosted_versions(&available, &minimum, &parse_version(cluster_version)?);

        let mut version = input.version.trim().to_string();
        if version.is_empty() {
            version = cluster_version.to_string();
        }
        if self.session.is_interactive() && !options.is_empty() {
            version = self
                .prompter
                .select(&Question::new("OpenShift version", VERSION_HELP), &options, &version)
                .map_err(PoolError::prompt("Expected a valid OpenShift version"))?;
        }

        let wanted = parse_version(&version)?;
        options
            .iter()
            .find(|option| parse_version(option).is_ok_and(|v| v == wanted))
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                ValidationError::InvalidVersion(format!(
                    "version '{version}' is not available for node pools of cluster '{}', \
                     expected a version between {minimum} and {cluster_version}",
                    cluster.id
                ))
                .into()
            })
    }

    fn resolve_autorepair(&mut self, input: &PoolInput) -> Result<bool, PoolError> {
        if !self.session.is_interactive() {
            return Ok(input.autorepair);
        }
        self.prompter
            .input_bool(&Question::new("Autorepair", AUTOREPAIR_HELP), input.autorepair)
            .map_err(PoolError::prompt("Expected a valid value for autorepair"))
    }

    async fn resolve_configs(&mut self, kind: ConfigKind, raw: &str) -> Result<Vec<String>, PoolError> {
        let requested = split_list(raw);
        if requested.is_empty() && !self.session.is_interactive() {
            return Ok(Vec::new());
        }

        let cluster = self.cluster;
        let fetched = match kind {
            ConfigKind::Tuning => self.control_plane.tuning_config_names(&cluster.id).await,
            ConfigKind::Kubelet => self.control_plane.kubelet_config_names(&cluster.id).await,
        };
        let available = fetched.map_err(PoolError::api(format!(
            "Failed to fetch {} for cluster '{}'",
            kind.label(),
            cluster.id
        )))?;

        if available.is_empty() {
            if !requested.is_empty() {
                warn!(
                    "No {} available for cluster '{}'. Any {} in input will be ignored",
                    kind.label(),
                    cluster.id,
                    kind.label()
                );
            }
            return Ok(Vec::new());
        }

        let mut chosen = requested;
        if self.session.is_interactive() {
            chosen = self
                .prompter
                .multi_select(&kind.question(), &available, &chosen)
                .map_err(PoolError::prompt(format!("Expected a valid value for {}", kind.label())))?;
        }
        if kind == ConfigKind::Kubelet {
            validate_kubelet_configs(&chosen)?;
        }
        validate_config_names(kind.label(), &chosen, &available)?;
        Ok(chosen)
    }

    fn resolve_drain_grace_period(&mut self, input: &PoolInput) -> Result<Option<u32>, PoolError> {
        let mut raw = input.node_drain_grace_period.clone();
        if self.session.is_interactive() {
            let check = |s: &str| parse_node_drain_grace_period(s).map(|_| ()).map_err(|e| e.to_string());
            raw = self
                .prompter
                .input_string(&Question::new("Node drain grace period", DRAIN_HELP), &raw, false, Some(&check))
                .map_err(PoolError::prompt("Expected a valid value for node drain grace period"))?;
        }
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(parse_node_drain_grace_period(&raw)?))
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn check_rules(rules: &[Rule], cluster: &Cluster, input: &PoolInput) -> Result<(), ValidationError> {
    debug!("Evaluating {} flag rules for cluster '{}'", rules.len(), cluster.id);
    run_rules(rules, &RuleContext { cluster, input })
}

const fn replica_floor(value: i64, hosted: bool, autoscaling: bool, multi_az_pool: bool) -> Result<(), ValidationError> {
    if hosted {
        validate_node_pool_min_replicas(value, autoscaling)
    } else {
        validate_min_replicas(value, multi_az_pool)
    }
}

const fn replica_ceiling(min: i64, max: i64, hosted: bool, multi_az_pool: bool) -> Result<(), ValidationError> {
    if hosted {
        validate_node_pool_max_replicas(min, max)
    } else {
        validate_max_replicas(min, max, multi_az_pool)
    }
}
