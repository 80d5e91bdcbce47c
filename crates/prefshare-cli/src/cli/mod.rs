//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use prefshare_core::api::{PreferenceField, UserSignup};
use prefshare_core::config::{Config, UrlKey, paths};
use prefshare_core::logging;

mod commands;

#[derive(Parser)]
#[command(name = "prefshare")]
#[command(version)]
#[command(about = "Share your email, phone and address on your own terms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a user account
    Signup(SignupArgs),

    /// Log in as a user
    Login(CredentialsArgs),

    /// Forget the stored token
    Logout {
        /// Log out the admin instead of the user
        #[arg(long)]
        admin: bool,
    },

    /// Check whether a username is free
    CheckUsername {
        #[arg(value_name = "NAME")]
        username: String,
        /// Check the admin namespace
        #[arg(long)]
        admin: bool,
    },

    /// Show which fields you currently share
    Overview,

    /// View and change sharing permissions
    Preferences {
        #[command(subcommand)]
        command: PreferenceCommands,
    },

    /// Administrator commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct CredentialsArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "PREFSHARE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(clap::Args, Debug, Clone)]
struct SignupArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    address: String,
    #[arg(long, env = "PREFSHARE_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long = "password-confirm")]
    password_confirm: String,
    /// Share your email from the start
    #[arg(long)]
    share_email: bool,
    /// Share your phone from the start
    #[arg(long)]
    share_phone: bool,
    /// Share your address from the start
    #[arg(long)]
    share_address: bool,
}

#[derive(clap::Subcommand)]
enum PreferenceCommands {
    /// Show the current toggles
    Show,
    /// Start sharing a field (prompts for its value unless --value is given)
    Enable {
        #[arg(value_name = "FIELD", value_parser = parse_field)]
        field: PreferenceField,
        #[arg(long)]
        value: Option<String>,
    },
    /// Stop sharing a field
    Disable {
        #[arg(value_name = "FIELD", value_parser = parse_field)]
        field: PreferenceField,
    },
}

#[derive(clap::Subcommand)]
enum AdminCommands {
    /// Create an admin account
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long, env = "PREFSHARE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long = "password-confirm")]
        password_confirm: String,
    },
    /// Log in as an admin
    Login(CredentialsArgs),
    /// Show users, audit logs and the location breakdown
    Dashboard,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Persist a backend URL (api, profile or geo)
    SetUrl {
        #[arg(value_name = "KEY", value_parser = parse_url_key)]
        key: UrlKey,
        #[arg(value_name = "URL")]
        url: String,
    },
}

fn parse_field(raw: &str) -> Result<PreferenceField, String> {
    raw.parse()
}

fn parse_url_key(raw: &str) -> Result<UrlKey, String> {
    raw.parse()
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config).context("init logging")?;
    tracing::debug!(path = %paths::config_path().display(), "config loaded");

    match cli.command {
        Commands::Signup(args) => commands::account::signup(&config, args.into_form()).await,
        Commands::Login(args) => {
            commands::account::login(&config, &args.username, &args.password).await
        }
        Commands::Logout { admin } => commands::account::logout(admin),
        Commands::CheckUsername { username, admin } => {
            commands::account::check_username(&config, &username, admin).await
        }
        Commands::Overview => commands::overview::show(&config).await,
        Commands::Preferences { command } => match command {
            PreferenceCommands::Show => commands::preferences::show(&config).await,
            PreferenceCommands::Enable { field, value } => {
                commands::preferences::enable(&config, field, value.as_deref()).await
            }
            PreferenceCommands::Disable { field } => {
                commands::preferences::disable(&config, field).await
            }
        },
        Commands::Admin { command } => match command {
            AdminCommands::Signup {
                username,
                password,
                password_confirm,
            } => commands::admin::signup(&config, &username, &password, &password_confirm).await,
            AdminCommands::Login(args) => {
                commands::admin::login(&config, &args.username, &args.password).await
            }
            AdminCommands::Dashboard => commands::admin::dashboard(&config).await,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetUrl { key, url } => commands::config::set_url(key, &url),
        },
    }
}

impl SignupArgs {
    fn into_form(self) -> UserSignup {
        UserSignup {
            username: self.username,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            password: self.password,
            password_confirm: self.password_confirm,
            email_permission: self.share_email,
            phone_permission: self.share_phone,
            address_permission: self.share_address,
        }
    }
}
