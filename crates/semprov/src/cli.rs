//! Clap derive structures for the `semprov` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use semprov_core::{QueuePermission, ShutdownMode};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// semprov -- provisioning for redundant SEMP appliance pairs
#[derive(Debug, Parser)]
#[command(
    name = "semprov",
    version,
    about = "Provision messaging appliance pairs over SEMP",
    long_about = "Builds validated SEMP configuration commands and sends them to\n\
        the primary and backup appliance of each selected environment.\n\n\
        Every mutating step is checked against live state first, so re-running\n\
        a command only sends what is still missing.",
    disable_version_flag = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Print version
    #[arg(long = "version", action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Environments to act on, comma separated (e.g. dev,ci1)
    #[arg(
        long = "env",
        short = 'e',
        alias = "environment",
        env = "SEMPROV_ENV",
        value_delimiter = ',',
        global = true
    )]
    pub envs: Vec<String>,

    /// Settings file (overrides the default search path)
    #[arg(long, env = "SEMPROV_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Use read-only credentials and send no changes
    #[arg(long, short = 't', global = true)]
    pub testmode: bool,

    /// Skip existence and in-use checks
    #[arg(long, short = 'f', global = true)]
    pub force: bool,

    /// Debug logging (same as -vv)
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SEMPROV_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision every VPN of a site definition
    #[command(alias = "prov")]
    Provision(ProvisionArgs),

    /// Manage queues
    #[command(alias = "q")]
    Queue(QueueArgs),

    /// Manage client usernames
    #[command(alias = "u")]
    User(UserArgs),

    /// Manage message VPNs
    Vpn(VpnArgs),

    /// Manage client profiles
    Profile(ProfileArgs),

    /// Manage ACL profiles
    Acl(AclArgs),

    /// Bridge VPNs between a local and a remote environment
    Bridge(BridgeArgs),

    /// List connected clients
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Gather statistics as metrics
    Metrics(MetricsArgs),

    /// Show roles, spool state and version of each appliance
    Status,

    /// Manage CLI settings and credentials
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROVISION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// Site definition (YAML)
    #[arg(long, short = 's')]
    pub site: PathBuf,

    /// Only VPNs with this owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Only these VPNs, by name on the appliance (comma separated)
    #[arg(long = "vpns", short = 'V', value_delimiter = ',')]
    pub vpns: Vec<String>,

    /// Shut down live objects to apply structural changes: off, q, u or b
    #[arg(long, default_value = "off", value_parser = clap::value_parser!(ShutdownMode))]
    pub shutdown: ShutdownMode,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  QUEUES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// List queues in a VPN
    #[command(alias = "ls")]
    List {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        /// Name filter, wildcards allowed
        #[arg(long, default_value = "*")]
        filter: String,
    },

    /// Create or reconfigure queues
    #[command(alias = "apply")]
    Create(QueueCreateArgs),

    /// Shut down and delete queues
    #[command(alias = "rm")]
    Delete {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        /// Queue names (comma separated)
        #[arg(long, short = 'Q', value_delimiter = ',', required = true)]
        queues: Vec<String>,

        /// Stop after the shutdown
        #[arg(long, short = 's')]
        shutdown_only: bool,
    },

    /// Delete every spooled message in queues
    Purge {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        /// Queue names (comma separated)
        #[arg(long, short = 'Q', value_delimiter = ',', required = true)]
        queues: Vec<String>,

        /// Treat each queue name as a wildcard pattern
        #[arg(long, short = 'r')]
        pattern: bool,
    },

    /// Change the permission non-owners hold on queues
    ///
    /// Egress is shut down for the change and the queue enabled afterwards.
    #[command(alias = "perm")]
    Permission {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        /// Queue names (comma separated)
        #[arg(long, short = 'Q', value_delimiter = ',', required = true)]
        queues: Vec<String>,

        /// no-access, read-only, consume, modify-topic or delete
        #[arg(
            long,
            short = 'p',
            default_value = "modify-topic",
            value_parser = clap::value_parser!(QueuePermission)
        )]
        permission: QueuePermission,
    },
}

#[derive(Debug, Args)]
pub struct QueueCreateArgs {
    #[arg(long = "vpn", short = 'V')]
    pub vpn: String,

    /// Queue names (comma separated)
    #[arg(long, short = 'Q', value_delimiter = ',', required = true)]
    pub queues: Vec<String>,

    /// Non-exclusive access (default exclusive)
    #[arg(long)]
    pub non_exclusive: bool,

    /// Spool quota in MB
    #[arg(long)]
    pub size: Option<u64>,

    /// Owning client username (default: the VPN name)
    #[arg(long)]
    pub owner: Option<String>,

    /// Permission for everyone else: "all" or "consume"
    #[arg(long)]
    pub consume: Option<String>,

    #[arg(long)]
    pub max_bind_count: Option<u32>,

    /// Max redelivery attempts
    #[arg(long)]
    pub retries: Option<u32>,

    /// Shut down live queues to apply structural changes: off, q, u or b
    #[arg(long, default_value = "off", value_parser = clap::value_parser!(ShutdownMode))]
    pub shutdown: ShutdownMode,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CLIENT USERNAMES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List client usernames in a VPN
    #[command(alias = "ls")]
    List {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        #[arg(long, default_value = "*")]
        filter: String,
    },

    /// Create or reconfigure a client username
    #[command(alias = "apply")]
    Create {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        #[arg(long, short = 'u')]
        username: String,

        /// Password (prompted when omitted)
        #[arg(long, short = 'p', env = "SEMPROV_USER_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long, default_value = "glassfish")]
        client_profile: String,

        /// ACL profile (default: the VPN name)
        #[arg(long)]
        acl_profile: Option<String>,

        /// Shut down a live username to apply structural changes: off, q, u or b
        #[arg(long, default_value = "off", value_parser = clap::value_parser!(ShutdownMode))]
        shutdown: ShutdownMode,
    },

    /// Shut down client usernames, optionally removing them
    #[command(alias = "rm")]
    Delete {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        /// Usernames (comma separated)
        #[arg(long = "users", short = 'u', value_delimiter = ',', required = true)]
        users: Vec<String>,

        /// Delete after shutting down
        #[arg(long, short = 'r')]
        remove: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VPNS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct VpnArgs {
    #[command(subcommand)]
    pub command: VpnCommand,
}

#[derive(Debug, Subcommand)]
pub enum VpnCommand {
    /// List VPN names
    #[command(alias = "ls")]
    List {
        #[arg(long, default_value = "*")]
        filter: String,
    },

    /// Create or reconfigure a VPN
    #[command(alias = "apply")]
    Create {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        /// Spool quota in MB
        #[arg(long)]
        spool_size: Option<u64>,

        /// Large message event threshold in KB
        #[arg(long)]
        large_message_threshold: Option<u64>,
    },

    /// Delete a VPN with its queues, usernames and ACL profile
    #[command(alias = "rm")]
    Delete {
        #[arg(long = "vpn", short = 'V')]
        vpn: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROFILES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Create or reconfigure a client profile
    #[command(alias = "apply")]
    Create {
        #[arg(long, short = 'n', default_value = "glassfish")]
        name: String,

        /// VPN the profile belongs to (soltr/7_1_1 and later)
        #[arg(long = "vpn", short = 'V')]
        vpn: String,

        /// Max connections per client username
        #[arg(long, short = 'm')]
        max_clients: Option<u32>,

        /// Allow bridge connections
        #[arg(long, short = 'b')]
        bridging: bool,
    },

    /// Delete a client profile
    #[command(alias = "rm")]
    Delete {
        #[arg(long, short = 'n')]
        name: String,

        #[arg(long = "vpn", short = 'V')]
        vpn: String,
    },
}

#[derive(Debug, Args)]
pub struct AclArgs {
    #[command(subcommand)]
    pub command: AclCommand,
}

#[derive(Debug, Subcommand)]
pub enum AclCommand {
    /// Create an allow-all ACL profile
    #[command(alias = "apply")]
    Create {
        /// Profile name (default: the VPN name)
        #[arg(long, short = 'n')]
        name: Option<String>,

        #[arg(long = "vpn", short = 'V')]
        vpn: String,
    },

    /// Delete an ACL profile
    #[command(alias = "rm")]
    Delete {
        #[arg(long, short = 'n')]
        name: Option<String>,

        #[arg(long = "vpn", short = 'V')]
        vpn: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BRIDGES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BridgeArgs {
    /// Local environment
    #[arg(long)]
    pub local: String,

    /// Remote (DR) environment
    #[arg(long)]
    pub remote: String,

    /// VPNs to bridge (comma separated)
    #[arg(long = "vpns", short = 'V', value_delimiter = ',', required = true)]
    pub vpns: Vec<String>,

    /// Service address of the remote cluster, e.g. 10.96.12.6:55555
    #[arg(long)]
    pub remote_addr: String,

    /// Local interface used to reach the remote cluster
    #[arg(long, default_value = "1/1/lag1")]
    pub phys_intf: String,

    /// Router name of the local cluster's primary node
    #[arg(long, default_value = "solace1")]
    pub node: String,

    /// Bridge client username password (prompted when omitted)
    #[arg(long, short = 'p', env = "SEMPROV_BRIDGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  QUERIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[arg(long = "vpn", short = 'V')]
    pub vpn: String,

    /// Client name filter, wildcards allowed
    #[arg(long, default_value = "*")]
    pub filter: String,
}

#[derive(Debug, Args)]
pub struct MetricsArgs {
    /// Gather client stats
    #[arg(long)]
    pub clients: bool,

    /// Gather client spool stats
    #[arg(long)]
    pub client_spools: bool,

    /// Gather VPN stats
    #[arg(long)]
    pub vpns: bool,

    /// Gather message spool stats
    #[arg(long)]
    pub spool: bool,

    /// Object filter, e.g. '*' or 'prod_foo'
    #[arg(long, default_value = "*")]
    pub filter: String,

    /// Print line protocol instead of the output format
    #[arg(long)]
    pub line_protocol: bool,

    /// Write the samples to this InfluxDB host instead of printing them
    #[arg(long, value_name = "HOST")]
    pub influxdb_host: Option<String>,

    #[arg(long, default_value_t = 8086, requires = "influxdb_host")]
    pub influxdb_port: u16,

    #[arg(long, requires = "influxdb_host")]
    pub influxdb_user: Option<String>,

    #[arg(long, env = "SEMPROV_INFLUXDB_PASS", hide_env_values = true, requires = "influxdb_user")]
    pub influxdb_pass: Option<String>,

    /// Target database
    #[arg(long, default_value = "solace")]
    pub influxdb_db: String,

    /// Retention time for --set-retention, e.g. 1h, 90m, 12h, 7d or 4w
    #[arg(long, default_value = "4w", value_parser = retention_duration)]
    pub retention: String,

    /// Apply --retention to the database's default retention policy
    #[arg(long, requires = "influxdb_host")]
    pub set_retention: bool,
}

fn retention_duration(value: &str) -> Result<String, String> {
    let unit = value.trim_start_matches(|c: char| c.is_ascii_digit());
    if unit.len() < value.len() && matches!(unit, "m" | "h" | "d" | "w") {
        Ok(value.to_owned())
    } else {
        Err(format!("'{value}' is not a duration such as 90m, 12h, 7d or 4w"))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the settings file in use and the search path
    Path,

    /// Display the resolved settings with secrets masked
    Show,

    /// List configured environments
    Envs,

    /// Store an environment password in the system keyring
    SetPassword {
        /// Environment name
        #[arg(long = "environment", short = 'n')]
        environment: String,

        /// Store the read-only account's password
        #[arg(long)]
        read_only: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
