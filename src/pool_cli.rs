//! Command-line surface.
//!
//! Unique responsibility: parse `poolctl` arguments, record where every
//! `create` flag came from, and dispatch to [`PoolService`].

use std::ffi::OsString;
use std::io::Write;

use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};

use crate::pool_client::{HttpControlPlane, RestTransport};
use crate::pool_cloud::HttpCloudProvider;
use crate::pool_config::ApiConfig;
use crate::pool_error::PoolError;
use crate::pool_model::{DEFAULT_INSTANCE_TYPE, Flag, FlagSet, ON_DEMAND_PRICE, PoolInput, Provenance, Session};
use crate::pool_output::OutputFormat;
use crate::pool_prompt::TerminalPrompter;
use crate::pool_service::PoolService;

#[derive(Debug, Parser)]
#[command(
    name = "poolctl",
    version,
    about = "poolctl - manage machine pools and node pools of managed Kubernetes clusters"
)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Name, ID or external ID of the cluster.
    #[arg(short = 'c', long, env = "POOLCTL_CLUSTER", global = true)]
    pub cluster: Option<String>,

    /// Output format.
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    /// Ask for every value, using flag values as defaults.
    #[arg(short = 'i', long, global = true)]
    pub interactive: bool,

    /// Answer yes to confirmations.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a machine pool to a cluster.
    Create(Box<CreateArgs>),
    /// List the machine pools of a cluster.
    List,
    /// Show the details of a machine pool.
    Describe(PoolIdArgs),
    /// Delete a machine pool.
    Delete(PoolIdArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PoolIdArgs {
    /// Machine pool ID.
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    /// Name of the machine pool.
    #[arg(value_name = "NAME")]
    pub name_arg: Option<String>,

    /// Name of the machine pool (takes precedence over the positional name).
    #[arg(long)]
    pub name: Option<String>,

    /// Fixed number of machines.
    #[arg(long, allow_negative_numbers = true)]
    pub replicas: Option<i64>,

    /// Scale between --min-replicas and --max-replicas.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true",
          default_value_t = false, action = ArgAction::Set)]
    pub enable_autoscaling: bool,

    /// Minimum number of machines when autoscaling.
    #[arg(long, allow_negative_numbers = true)]
    pub min_replicas: Option<i64>,

    /// Maximum number of machines when autoscaling.
    #[arg(long, allow_negative_numbers = true)]
    pub max_replicas: Option<i64>,

    /// Instance type of the machines.
    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    pub instance_type: String,

    /// Node labels, `key=value,key=value`.
    #[arg(long)]
    pub labels: Option<String>,

    /// Node taints, `key=value:Effect,...`.
    #[arg(long)]
    pub taints: Option<String>,

    /// Use spot instances.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true",
          default_value_t = false, action = ArgAction::Set)]
    pub use_spot_instances: bool,

    /// Max hourly spot price, or `on-demand`.
    #[arg(long, default_value = ON_DEMAND_PRICE)]
    pub spot_max_price: String,

    /// Spread the machine pool over every zone of a multi-AZ cluster.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true",
          default_value_t = true, action = ArgAction::Set)]
    pub multi_availability_zone: bool,

    /// Single availability zone of the machine pool.
    #[arg(long)]
    pub availability_zone: Option<String>,

    /// Single subnet of the machine pool (BYO VPC clusters).
    #[arg(long)]
    pub subnet: Option<String>,

    /// OpenShift version of the node pool (hosted clusters).
    #[arg(long)]
    pub version: Option<String>,

    /// Repair unhealthy nodes automatically (hosted clusters).
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true",
          default_value_t = true, action = ArgAction::Set)]
    pub autorepair: bool,

    /// Tuning configs, comma separated (hosted clusters).
    #[arg(long)]
    pub tuning_configs: Option<String>,

    /// Kubelet config name (hosted clusters).
    #[arg(long)]
    pub kubelet_configs: Option<String>,

    /// Root disk size, e.g. `300GiB` or `1TiB`.
    #[arg(long)]
    pub disk_size: Option<String>,

    /// Additional security group IDs, comma separated.
    #[arg(long = "additional-security-group-ids", value_delimiter = ',')]
    pub security_group_ids: Vec<String>,

    /// Cloud resource tags, `key:value,key:value`.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Node drain grace period, e.g. `30 minutes` or `1 hour` (hosted clusters).
    #[arg(long)]
    pub node_drain_grace_period: Option<String>,
}

impl CreateArgs {
    /// Raw input for the resolver.
    #[must_use]
    pub fn into_input(self, flags: FlagSet) -> PoolInput {
        PoolInput {
            name: self.name.or(self.name_arg).unwrap_or_default(),
            instance_type: self.instance_type,
            replicas: self.replicas.unwrap_or_default(),
            autoscaling: self.enable_autoscaling,
            min_replicas: self.min_replicas.unwrap_or_default(),
            max_replicas: self.max_replicas.unwrap_or_default(),
            labels: self.labels.unwrap_or_default(),
            taints: self.taints.unwrap_or_default(),
            use_spot_instances: self.use_spot_instances,
            spot_max_price: self.spot_max_price,
            multi_availability_zone: self.multi_availability_zone,
            availability_zone: self.availability_zone.unwrap_or_default(),
            subnet: self.subnet.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            autorepair: self.autorepair,
            tuning_configs: self.tuning_configs.unwrap_or_default(),
            kubelet_configs: self.kubelet_configs.unwrap_or_default(),
            disk_size: self.disk_size.unwrap_or_default(),
            security_group_ids: self.security_group_ids,
            tags: self.tags,
            node_drain_grace_period: self.node_drain_grace_period.unwrap_or_default(),
            flags,
        }
    }
}

impl Cli {
    /// Parse arguments and capture the provenance of every `create` flag.
    ///
    /// # Errors
    ///
    /// Invalid arguments, or `--help`/`--version` (clap reports those as errors to exit with).
    pub fn parse_with_provenance<I, T>(args: I) -> Result<(Self, FlagSet), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let cli = Self::from_arg_matches(&matches)?;
        let flags = matches
            .subcommand_matches("create")
            .map(create_provenance)
            .unwrap_or_default();
        Ok((cli, flags))
    }
}

/// Argument ID of each flag in [`CreateArgs`].
const fn arg_id(flag: Flag) -> &'static str {
    match flag {
        Flag::Name => "name",
        Flag::InstanceType => "instance_type",
        Flag::Replicas => "replicas",
        Flag::EnableAutoscaling => "enable_autoscaling",
        Flag::MinReplicas => "min_replicas",
        Flag::MaxReplicas => "max_replicas",
        Flag::Labels => "labels",
        Flag::Taints => "taints",
        Flag::UseSpotInstances => "use_spot_instances",
        Flag::SpotMaxPrice => "spot_max_price",
        Flag::MultiAvailabilityZone => "multi_availability_zone",
        Flag::AvailabilityZone => "availability_zone",
        Flag::Subnet => "subnet",
        Flag::Version => "version",
        Flag::Autorepair => "autorepair",
        Flag::TuningConfigs => "tuning_configs",
        Flag::KubeletConfigs => "kubelet_configs",
        Flag::DiskSize => "disk_size",
        Flag::SecurityGroupIds => "security_group_ids",
        Flag::Tags => "tags",
        Flag::NodeDrainGracePeriod => "node_drain_grace_period",
    }
}

fn provenance(matches: &ArgMatches, id: &str) -> Provenance {
    match matches.value_source(id) {
        Some(ValueSource::CommandLine | ValueSource::EnvVariable) => Provenance::Explicit,
        Some(ValueSource::DefaultValue) => Provenance::Default,
        _ => Provenance::Unset,
    }
}

fn create_provenance(matches: &ArgMatches) -> FlagSet {
    let mut flags = FlagSet::new();
    for flag in Flag::ALL {
        flags.record(flag, provenance(matches, arg_id(flag)));
    }
    if provenance(matches, "name_arg") == Provenance::Explicit {
        flags.record(Flag::Name, Provenance::Explicit);
    }
    flags
}

/// Run a parsed command against the configured API, writing results to `out`.
///
/// # Errors
///
/// Missing cluster, configuration, or any workflow failure.
pub async fn run(cli: Cli, flags: FlagSet, out: &mut dyn Write) -> Result<(), PoolError> {
    let Cli { globals, command } = cli;
    let cluster_key = globals
        .cluster
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(PoolError::MissingCluster)?;

    let config = ApiConfig::from_env().map_err(PoolError::Config)?;
    let rest = RestTransport::new(config).map_err(PoolError::Config)?;
    let control_plane = HttpControlPlane::new(rest.clone());
    let cloud = HttpCloudProvider::new(rest);
    let service = PoolService::new(&control_plane, &cloud);

    let session = Session::new(globals.interactive, globals.yes);
    let mut prompter = TerminalPrompter::stdio();

    match command {
        Commands::Create(args) => {
            let input = (*args).into_input(flags);
            service
                .create(cluster_key, &input, session, globals.output, &mut prompter, out)
                .await
        }
        Commands::List => service.list(cluster_key, globals.output, out).await,
        Commands::Describe(args) => service.describe(cluster_key, &args.id, globals.output, out).await,
        Commands::Delete(args) => service.delete(cluster_key, &args.id, session, &mut prompter, out).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Cli, FlagSet) {
        Cli::parse_with_provenance(args.iter().copied()).unwrap()
    }

    fn create_input(args: &[&str]) -> PoolInput {
        let (cli, flags) = parse(args);
        let Commands::Create(create) = cli.command else {
            panic!("expected create");
        };
        (*create).into_input(flags)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_flags_record_three_valued_provenance() {
        let input = create_input(&["poolctl", "-c", "demo", "create", "mp1", "--replicas", "3"]);
        assert_eq!(input.name, "mp1");
        assert_eq!(input.replicas, 3);
        assert_eq!(input.flags.provenance(Flag::Name), Provenance::Explicit);
        assert_eq!(input.flags.provenance(Flag::Replicas), Provenance::Explicit);
        assert_eq!(input.flags.provenance(Flag::InstanceType), Provenance::Default);
        assert_eq!(input.flags.provenance(Flag::MultiAvailabilityZone), Provenance::Default);
        assert_eq!(input.flags.provenance(Flag::Labels), Provenance::Unset);
        assert_eq!(input.instance_type, DEFAULT_INSTANCE_TYPE);
        assert_eq!(input.spot_max_price, ON_DEMAND_PRICE);
        assert!(input.multi_availability_zone);
        assert!(input.autorepair);
    }

    #[test]
    fn bare_bool_flags_mean_true_and_accept_explicit_values() {
        let input = create_input(&[
            "poolctl",
            "create",
            "--use-spot-instances",
            "--multi-availability-zone=false",
            "mp1",
        ]);
        assert!(input.use_spot_instances);
        assert!(!input.multi_availability_zone);
        assert!(input.is_set(Flag::UseSpotInstances));
        assert!(input.is_set(Flag::MultiAvailabilityZone));
        assert_eq!(input.name, "mp1");
    }

    #[test]
    fn negative_replica_values_reach_the_validators() {
        let input = create_input(&[
            "poolctl",
            "create",
            "mp1",
            "--enable-autoscaling",
            "--min-replicas",
            "-1",
            "--max-replicas",
            "3",
        ]);
        assert!(input.autoscaling);
        assert_eq!(input.min_replicas, -1);
        assert_eq!(input.max_replicas, 3);
    }

    #[test]
    fn name_flag_wins_over_positional_name() {
        let input = create_input(&["poolctl", "create", "positional", "--name", "flagged"]);
        assert_eq!(input.name, "flagged");
        assert!(input.is_set(Flag::Name));
    }

    #[test]
    fn list_flags_split_on_commas() {
        let input = create_input(&[
            "poolctl",
            "create",
            "mp1",
            "--additional-security-group-ids",
            "sg-1,sg-2",
            "--tags",
            "team:infra,env:dev",
        ]);
        assert_eq!(input.security_group_ids, vec!["sg-1", "sg-2"]);
        assert_eq!(input.tags, vec!["team:infra", "env:dev"]);
        assert!(input.is_set(Flag::SecurityGroupIds));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let (cli, flags) = parse(&["poolctl", "describe", "mp1", "-c", "demo", "-o", "json", "-y"]);
        assert_eq!(cli.globals.cluster.as_deref(), Some("demo"));
        assert_eq!(cli.globals.output, OutputFormat::Json);
        assert!(cli.globals.yes);
        assert!(matches!(cli.command, Commands::Describe(PoolIdArgs { ref id }) if id == "mp1"));
        assert_eq!(flags, FlagSet::new());
    }
}
