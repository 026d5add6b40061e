use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use time::Duration;

const DEFAULT_AUTH_COOKIE_NAME: &str = "auth";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(SocketAddr, taskara::config::AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }
    if let Some(Command::AuthKey) = cli.command {
        let code = run_auth_key();
        return RunOutcome::Exit(code);
    }

    let database = match cli.database.as_ref() {
        Some(database) => database.clone(),
        None => {
            eprintln!("error: --database is required unless using a subcommand");
            return RunOutcome::Exit(2);
        }
    };

    let auth = match resolve_auth_config(&cli) {
        Ok(auth) => auth,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve(
        cli.bind,
        taskara::config::AppConfig {
            database_path: database,
            app_name: cli.app_name,
            public_url: cli.public_url,
            auth,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
            mail_api_url: cli.mail_api_url,
            mail_api_token: cli.mail_api_token,
            mail_from: cli.mail_from,
            cache_capacity: cli.cache_capacity,
        },
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "taskara",
    version,
    about = "Task and project management server"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "TASKARA_DATABASE")]
    database: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:3000", env = "TASKARA_BIND")]
    bind: SocketAddr,
    #[arg(long, default_value = "Taskara")]
    app_name: String,
    #[arg(long, default_value = "http://localhost:3000", env = "TASKARA_PUBLIC_URL")]
    public_url: String,
    #[arg(long, env = "TASKARA_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "TASKARA_AUTH_TOKEN_TTL")]
    auth_token_ttl: Option<String>,
    #[arg(long, env = "TASKARA_AUTH_COOKIE_NAME")]
    auth_cookie_name: Option<String>,
    #[arg(long, env = "TASKARA_AUTH_COOKIE_SECURE")]
    auth_cookie_secure: bool,
    #[arg(long, env = "TASKARA_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "TASKARA_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "TASKARA_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "TASKARA_MAIL_API_URL")]
    mail_api_url: Option<String>,
    #[arg(long, env = "TASKARA_MAIL_API_TOKEN")]
    mail_api_token: Option<String>,
    #[arg(long, env = "TASKARA_MAIL_FROM")]
    mail_from: Option<String>,
    #[arg(long, default_value_t = 100)]
    cache_capacity: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    Init(InitArgs),
    AuthKey,
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match taskara::push::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("TASKARA_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("TASKARA_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("TASKARA_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace TASKARA_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

fn run_auth_key() -> i32 {
    let secret = match taskara::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn resolve_auth_config(cli: &Cli) -> Result<taskara::config::AuthConfig, String> {
    let auth_key = cli
        .auth_key
        .as_deref()
        .ok_or("TASKARA_AUTH_KEY (or --auth-key) is required to serve")?
        .trim();
    if auth_key.is_empty() {
        return Err("auth key cannot be empty".to_string());
    }

    if let Some(name) = cli.auth_cookie_name.as_deref()
        && name.trim().is_empty()
    {
        return Err("auth cookie name cannot be empty".to_string());
    }

    let token_ttl = match cli.auth_token_ttl.as_deref() {
        Some(raw) => parse_auth_token_ttl(raw)?,
        None => default_auth_token_ttl(),
    };
    let cookie_name = cli
        .auth_cookie_name
        .as_deref()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());

    Ok(taskara::config::AuthConfig {
        key: auth_key.to_string(),
        token_ttl,
        cookie_name,
        cookie_secure: cli.auth_cookie_secure,
    })
}

fn default_auth_token_ttl() -> Duration {
    Duration::days(7)
}

fn parse_auth_token_ttl(raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("auth token ttl cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err("auth token ttl must be greater than 0".to_string());
    }

    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        _ => Err(format!(
            "invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}
