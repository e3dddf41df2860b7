use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Compact,
}

#[derive(Parser)]
#[command(name = "users")]
#[command(about = "Create, edit and delete user records on a REST server", version)]
#[command(after_help = "EXAMPLES:
    users list                                List users
    users create --fname Ada --lname Lovelace --email ada@x.com --birthday 1815-12-10
    users edit u1 --lname Byron               Change one field of a user
    users delete u1                           Delete a user")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json, compact)
    #[arg(long, short = 'o', global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Output as JSON (alias for --format json)
    #[arg(long, global = true, hide = true)]
    pub json: bool,

    /// Suppress success messages
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Show debug logs and detailed error information
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// API base URL (overrides USERS_API_URL and the config file)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (default: 5)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Get the effective output format, considering --json flag
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List users
    #[command(
        alias = "ls",
        after_help = "EXAMPLES:
    users list
    users list --refresh --format json"
    )]
    List {
        /// Ignore the local cache and fetch from the server
        #[arg(long)]
        refresh: bool,
    },
    /// Create a new user
    #[command(
        alias = "c",
        after_help = "EXAMPLES:
    users create --fname Ada --lname Lovelace --email ada@x.com --birthday 1815-12-10"
    )]
    Create(UserCreateArgs),
    /// Edit an existing user
    #[command(
        alias = "e",
        after_help = "EXAMPLES:
    users edit u1 --lname Byron
    users edit u1 --email ada@example.com --birthday 1815-12-10"
    )]
    Edit(UserEditArgs),
    /// Delete a user
    #[command(
        alias = "rm",
        after_help = "EXAMPLES:
    users delete u1"
    )]
    Delete {
        /// User id
        id: String,
    },
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    users completions bash > ~/.bash_completion.d/users
    users completions zsh > ~/.zfunc/_users
    users completions fish > ~/.config/fish/completions/users.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    #[command(after_help = "EXAMPLES:
    users init")]
    Init,
}

#[derive(Args)]
pub struct UserCreateArgs {
    /// First name
    #[arg(long, default_value = "")]
    pub fname: String,

    /// Last name
    #[arg(long, default_value = "")]
    pub lname: String,

    /// Email address
    #[arg(long, default_value = "")]
    pub email: String,

    /// Birthday (YYYY-MM-DD)
    #[arg(long, default_value = "")]
    pub birthday: String,
}

#[derive(Args)]
pub struct UserEditArgs {
    /// User id
    pub id: String,

    /// New first name
    #[arg(long)]
    pub fname: Option<String>,

    /// New last name
    #[arg(long)]
    pub lname: Option<String>,

    /// New email address
    #[arg(long)]
    pub email: Option<String>,

    /// New birthday (YYYY-MM-DD)
    #[arg(long)]
    pub birthday: Option<String>,
}
