use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use ucikit::{DesiredState, ItemKind, Request};

#[derive(Parser)]
#[command(name = "ucistate")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative, idempotent management of OpenWrt UCI configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/ucistate/config.toml)
    #[arg(long, global = true, env = "UCISTATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bring a section, option or list member to the desired state
    Apply(ApplyArgs),

    /// Print the current value of a UCI address
    Get(GetArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Package where the section is located (e.g. dhcp)
    #[arg(short, long, alias = "p")]
    pub package: String,

    /// Name of the section
    #[arg(short, long, alias = "s")]
    pub section: Option<String>,

    /// Type of the section; needed for anonymous or not yet existing sections
    #[arg(long = "type", value_name = "TYPE")]
    pub section_type: Option<String>,

    /// Index of an anonymous section of the given type
    #[arg(long, default_value_t = 0)]
    pub index: u32,

    /// Option or list to set/delete; omit to manage the section itself
    #[arg(short, long, alias = "key")]
    pub name: Option<String>,

    /// Desired value of the option or list member
    #[arg(long, alias = "val")]
    pub value: Option<String>,

    /// Whether the value is a single option or a list member
    #[arg(long, value_enum, default_value_t = ItemArg::Option)]
    pub item: ItemArg,

    /// Desired state of the section/option
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    pub state: StateArg,

    /// Allow creating missing sections and options (yes/no)
    #[arg(
        long,
        default_value = "yes",
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub create: bool,

    /// Report what would change without writing
    #[arg(long, alias = "check")]
    pub dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub tool: ToolArgs,
}

impl ApplyArgs {
    /// Build the reconciliation request from the arguments
    pub fn to_request(&self) -> Request {
        Request {
            package: self.package.clone(),
            section: self.section.clone(),
            section_type: self.section_type.clone(),
            index: self.index,
            name: self.name.clone(),
            value: self.value.clone(),
            item: self.item.into(),
            state: self.state.into(),
            create: self.create,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ItemArg {
    Option,
    List,
}

impl From<ItemArg> for ItemKind {
    fn from(arg: ItemArg) -> Self {
        match arg {
            ItemArg::Option => ItemKind::Option,
            ItemArg::List => ItemKind::List,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    Present,
    Absent,
}

impl From<StateArg> for DesiredState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Present => DesiredState::Present,
            StateArg::Absent => DesiredState::Absent,
        }
    }
}

// ============================================================================
// Get
// ============================================================================

#[derive(Args)]
pub struct GetArgs {
    /// Address to read, e.g. dhcp.lan.start or dhcp.@dnsmasq[0]
    pub address: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub tool: ToolArgs,
}

// ============================================================================
// Shared
// ============================================================================

#[derive(Args)]
pub struct ToolArgs {
    /// Path to the uci binary (overrides the config file)
    #[arg(long, env = "UCISTATE_BINARY")]
    pub binary: Option<PathBuf>,

    /// Alternative UCI configuration directory, passed as `uci -c`
    #[arg(long)]
    pub confdir: Option<PathBuf>,
}
