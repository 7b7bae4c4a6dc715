use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, bail};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use taskgate::api::{CreateTask, SearchTasks, TaskApi, UpdateTask};
use taskgate::consts;
use taskgate::context::RequestContext;
use taskgate::error::Error;
use taskgate::store::sqlite::SqliteTaskStore;
use taskgate::verifier::TokenVerifier;
use taskgate::verifier::remote::RemoteVerifier;
use taskgate::verifier::static_table::{StaticCredential, StaticVerifier};

#[derive(Debug, Clone, ValueEnum)]
enum AuthMode {
    /// Verify tokens against a configured table in this process.
    Static,
    /// Delegate verification to a remote auth authority.
    Remote,
}

#[derive(Parser)]
#[command(name = "taskgate", version, about = "Token-gated task API over stdin/stdout.")]
struct Cli {
    /// SQLite database path (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// How bearer tokens are verified
    #[arg(long, value_enum, default_value_t = AuthMode::Static)]
    auth: AuthMode,

    /// Base URL of the remote auth authority (remote mode)
    #[arg(long, env = consts::AUTH_URL_ENV)]
    auth_url: Option<String>,

    /// Static token as token=subject (static mode, repeatable)
    #[arg(long = "token", env = consts::TOKENS_ENV, value_delimiter = ',')]
    tokens: Vec<String>,

    /// Static login credential as username:password:token:subject
    /// (static mode, repeatable)
    #[arg(long = "credential")]
    credentials: Vec<String>,
}

/// One request per input line.
#[derive(Debug, Deserialize)]
struct Envelope {
    op: String,
    #[serde(default)]
    authorization: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default = "empty_body")]
    body: serde_json::Value,
}

fn empty_body() -> serde_json::Value {
    json!({})
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

fn parse_token_pair(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((token, subject)) if !token.is_empty() && !subject.is_empty() => {
            Ok((token.to_string(), subject.to_string()))
        }
        _ => bail!("expected token=subject, got {raw:?}"),
    }
}

fn parse_credential(raw: &str) -> anyhow::Result<StaticCredential> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [username, password, token, subject] = parts.as_slice() else {
        bail!("expected username:password:token:subject, got {raw:?}");
    };
    Ok(StaticCredential {
        username: username.to_string(),
        password: password.to_string(),
        token: token.to_string(),
        subject: subject.to_string(),
    })
}

fn build_static_verifier(cli: &Cli) -> anyhow::Result<StaticVerifier> {
    let mut credentials = Vec::new();
    for raw in &cli.credentials {
        credentials.push(parse_credential(raw)?);
    }
    for raw in &cli.tokens {
        let (token, subject) = parse_token_pair(raw)?;
        credentials.push(StaticCredential {
            username: String::new(),
            password: String::new(),
            token,
            subject,
        });
    }
    if credentials.is_empty() {
        bail!(
            "static auth mode needs at least one --token or --credential \
             (or {} in the environment)",
            consts::TOKENS_ENV
        );
    }
    Ok(StaticVerifier::with_credentials(credentials))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Static verifier is kept separately so the login op can reach its
    // credential table; remote mode delegates issuance to the authority.
    let (verifier, static_verifier): (Arc<dyn TokenVerifier>, Option<Arc<StaticVerifier>>) =
        match cli.auth {
            AuthMode::Static => {
                let verifier = Arc::new(build_static_verifier(&cli)?);
                (verifier.clone(), Some(verifier))
            }
            AuthMode::Remote => {
                let url = cli
                    .auth_url
                    .as_deref()
                    .with_context(|| format!("remote auth mode needs --auth-url or {}", consts::AUTH_URL_ENV))?;
                (Arc::new(RemoteVerifier::new(url)), None)
            }
        };

    let db_path = cli.db.clone().unwrap_or_else(consts::default_db_path);
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_str = db_path
        .to_str()
        .context("database path is not valid UTF-8")?;
    let store = Arc::new(SqliteTaskStore::open(db_str)?);

    let api = TaskApi::new(verifier, store);

    tracing::info!(db = %db_path.display(), "taskgate ready, one JSON request per line");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let ctx = RequestContext::new();
        let response = handle_line(&api, static_verifier.as_deref(), &ctx, &line).await;
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn handle_line(
    api: &TaskApi,
    static_verifier: Option<&StaticVerifier>,
    ctx: &RequestContext,
    line: &str,
) -> serde_json::Value {
    let envelope: Envelope = match serde_json::from_str(line) {
        Ok(env) => env,
        Err(err) => {
            return error_response(ctx, &Error::InvalidInput(format!("invalid request body: {err}")));
        }
    };
    match dispatch(api, static_verifier, ctx, envelope).await {
        Ok(ok) => json!({ "request_id": ctx.request_id(), "ok": ok }),
        Err(err) => error_response(ctx, &err),
    }
}

fn error_response(ctx: &RequestContext, err: &Error) -> serde_json::Value {
    if let Error::Internal(inner) = err {
        tracing::error!(request_id = ctx.request_id(), error = %inner, "internal error");
    }
    json!({
        "request_id": ctx.request_id(),
        "error": { "kind": err.kind(), "message": err.public_message() }
    })
}

async fn dispatch(
    api: &TaskApi,
    static_verifier: Option<&StaticVerifier>,
    ctx: &RequestContext,
    envelope: Envelope,
) -> taskgate::Result<serde_json::Value> {
    let auth = envelope.authorization.as_deref();
    let id = envelope.id.as_deref().unwrap_or_default();

    match envelope.op.as_str() {
        "create" => {
            let body: CreateTask = parse_body(envelope.body)?;
            let task = api.create(ctx, auth, body).await?;
            Ok(serde_json::to_value(task)?)
        }
        "list" => {
            let tasks = api.list(ctx, auth).await?;
            Ok(serde_json::to_value(tasks)?)
        }
        "get" => {
            let task = api.get(ctx, auth, id).await?;
            Ok(serde_json::to_value(task)?)
        }
        "update" => {
            let body: UpdateTask = parse_body(envelope.body)?;
            let task = api.update(ctx, auth, id, body).await?;
            Ok(serde_json::to_value(task)?)
        }
        "delete" => {
            api.delete(ctx, auth, id).await?;
            Ok(json!({ "deleted": true }))
        }
        "search" => {
            let body: SearchTasks = parse_body(envelope.body)?;
            let tasks = api.search(ctx, auth, body).await?;
            Ok(serde_json::to_value(tasks)?)
        }
        "login" => {
            let Some(verifier) = static_verifier else {
                return Err(Error::InvalidInput(
                    "login is only available in static auth mode".to_string(),
                ));
            };
            let body: LoginBody = parse_body(envelope.body)?;
            match verifier.login(&body.username, &body.password) {
                Some(token) => Ok(json!({
                    "access_token": token,
                    "token_type": consts::BEARER_SCHEME,
                })),
                None => Err(Error::Unauthenticated("invalid credentials".to_string())),
            }
        }
        other => Err(Error::InvalidInput(format!("unknown op: {other}"))),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> taskgate::Result<T> {
    serde_json::from_value(body).map_err(|err| Error::InvalidInput(format!("invalid request body: {err}")))
}
