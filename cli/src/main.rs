use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use pms_session::config::ConfigError;
use pms_session::preferences::{SyncOutcome, UnknownTheme};
use pms_session::types::RegisterRequest;
use pms_session::{
    AuthError, ClientConfig, FileStorage, GuardOutcome, InitState, MemoryNavigator, PreferenceChange, ProtectedRoute,
    SessionClient, Theme,
};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Theme(#[from] UnknownTheme),
    #[error("nothing to update; pass --language and/or --theme")]
    EmptyPreferences,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "pms", about = "Pharmacy dashboard session CLI")]
struct Cli {
    #[arg(long, env = "PMS_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "PMS_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<String>,

    #[arg(long, env = "PMS_CONNECT_TIMEOUT_SECS")]
    connect_timeout_secs: Option<String>,

    #[arg(long, env = "PMS_STORAGE_PATH", default_value = ".pms-session.json")]
    storage_path: PathBuf,

    /// Locale the session starts in before stored preferences apply.
    #[arg(long, env = "PMS_LOCALE", default_value = "en")]
    locale: String,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        username_or_email: String,
        #[arg(long, env = "PMS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register(RegisterArgs),
    /// Validate the stored token and print the current user.
    Whoami,
    Logout,
    /// Update theme and/or language.
    Prefs {
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        theme: Option<String>,
    },
    /// Exchange the stored refresh token for a new pair.
    Refresh,
    VerifyEmail {
        token: String,
    },
    ResendVerification {
        email: String,
    },
    /// Run the session check and route guard for a path.
    RouteCheck {
        path: String,
        #[arg(long)]
        permission: Option<String>,
    },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "PMS_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
    #[arg(long)]
    phone: Option<String>,
}

impl RegisterArgs {
    fn into_request(self) -> RegisterRequest {
        RegisterRequest {
            username: self.username,
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let config = ClientConfig::from_parts(
        cli.api_url.as_deref(),
        cli.request_timeout_secs.as_deref(),
        cli.connect_timeout_secs.as_deref(),
    )?;
    let storage = Arc::new(FileStorage::open(&cli.storage_path)?);
    let navigator = Arc::new(MemoryNavigator::new(&cli.locale, "/"));
    let client = SessionClient::new(config, storage, navigator)?;

    run(&client, cli.command).await
}

async fn run(client: &SessionClient, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { username_or_email, password } => {
            let auth = client.login(&username_or_email, &password).await?;
            eprintln!("signed in as {}", auth.user.display_name());
            print_json(&serde_json::to_value(&auth.user)?)
        }
        Command::Register(args) => {
            let registered = client.auth.register(&args.into_request()).await?;
            eprintln!("{}", registered.message);
            print_json(&serde_json::to_value(&registered.user)?)
        }
        Command::Whoami => {
            let user = client.auth.validate_token().await?;
            client.preferences.apply_stored_preferences(&user);
            print_json(&serde_json::to_value(&user)?)
        }
        Command::Logout => {
            client.logout().await;
            eprintln!("signed out");
            Ok(())
        }
        Command::Prefs { language, theme } => run_prefs(client, language, theme).await,
        Command::Refresh => {
            let pair = client.auth.refresh().await?;
            eprintln!("tokens refreshed; expires in {}s", pair.expires_in);
            Ok(())
        }
        Command::VerifyEmail { token } => {
            println!("{}", client.auth.verify_email(&token).await?);
            Ok(())
        }
        Command::ResendVerification { email } => {
            println!("{}", client.auth.resend_verification(&email).await?);
            Ok(())
        }
        Command::RouteCheck { path, permission } => {
            let guard = permission.map(ProtectedRoute::requiring).unwrap_or_default();
            let visit = client.visit(&path, Some(&guard)).await;
            println!("session: {}", describe_init(visit.init));
            if let Some(outcome) = visit.guard {
                println!("guard: {}", describe_guard(&outcome));
            }
            println!("location: {}", visit.location);
            Ok(())
        }
    }
}

async fn run_prefs(client: &SessionClient, language: Option<String>, theme: Option<String>) -> Result<(), CliError> {
    let theme = theme.as_deref().map(str::parse::<Theme>).transpose()?;
    let change = PreferenceChange { language, theme };
    if change.to_request().is_empty() {
        return Err(CliError::EmptyPreferences);
    }

    match client.preferences.update_preferences(change).await {
        SyncOutcome::LocalOnly => {
            eprintln!("not signed in; preferences applied locally only");
            Ok(())
        }
        SyncOutcome::Confirmed(user) => print_json(&serde_json::to_value(&user)?),
        SyncOutcome::Failed(e) => Err(e.into()),
    }
}

fn describe_init(state: InitState) -> &'static str {
    match state {
        InitState::Checking => "checking",
        InitState::AuthenticatedRedirect => "authenticated, redirected",
        InitState::AuthenticatedStay => "authenticated",
        InitState::UnauthenticatedRedirect => "signed out, redirected",
        InitState::UnauthenticatedStay => "signed out",
        InitState::Superseded => "superseded",
    }
}

fn describe_guard(outcome: &GuardOutcome) -> String {
    match outcome {
        GuardOutcome::Loading => "loading".to_owned(),
        GuardOutcome::Redirect(target) => format!("redirect to {target}"),
        GuardOutcome::Render => "render".to_owned(),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
