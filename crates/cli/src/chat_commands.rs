use {
    anyhow::Context,
    cadence_chat::{Error as ChatError, TurnReport},
    cadence_config::CadenceConfig,
    cadence_tools::EventRow,
    serde_json::Value,
    tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    tracing::debug,
};

use crate::app::{App, AppOptions};

const PROMPT: &str = "> ";

pub async fn chat(
    config: &CadenceConfig,
    options: &AppOptions,
    user: &str,
    message: Option<&str>,
) -> anyhow::Result<()> {
    let app = App::build(config, options).await?;
    ensure_session(&app, user).await?;

    match message {
        Some(message) => {
            let report = app.chat.turn(user, message).await?;
            println!("{}", report.reply);
        },
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_lines(&app, user, stdin, tokio::io::stdout()).await?;
        },
    }
    app.close().await;
    Ok(())
}

pub async fn login(config: &CadenceConfig, options: &AppOptions, user: &str) -> anyhow::Result<()> {
    let app = App::build(config, options).await?;
    let state = app.chat.login(user).await?;
    println!(
        "Logged in as {user} ({} tracked event(s), {}).",
        state.user_events.len(),
        if state.access_token.is_some() {
            "calendar connected"
        } else {
            "no calendar credential"
        }
    );
    app.close().await;
    Ok(())
}

pub async fn logout(config: &CadenceConfig, options: &AppOptions, user: &str) -> anyhow::Result<()> {
    let app = App::build(config, options).await?;
    if app.chat.logout(user).await? {
        println!("Logged out {user}.");
    } else {
        println!("{user} had no active session.");
    }
    app.close().await;
    Ok(())
}

pub async fn upcoming(
    config: &CadenceConfig,
    options: &AppOptions,
    user: &str,
) -> anyhow::Result<()> {
    let app = App::build(config, options).await?;
    let rows = app.chat.upcoming_events(user).await?;
    if rows.is_empty() {
        println!("No upcoming events.");
    }
    for row in &rows {
        println!("{}", format_row(row));
    }
    app.close().await;
    Ok(())
}

/// Run one tool as a full turn, so the registry is reconciled and persisted.
pub async fn call_tool(
    config: &CadenceConfig,
    options: &AppOptions,
    user: &str,
    name: &str,
    args: &str,
) -> anyhow::Result<()> {
    let app = App::build(config, options).await?;
    ensure_session(&app, user).await?;
    let report = app.chat.turn(user, &command_line(name, args)?).await?;
    for result in &report.results {
        println!("{}", serde_json::to_string_pretty(&result.output)?);
    }
    app.close().await;
    Ok(())
}

pub async fn list_tools(config: &CadenceConfig, options: &AppOptions) -> anyhow::Result<()> {
    let app = App::build(config, options).await?;
    for schema in app.chat.tools().list_schemas() {
        let name = schema["name"].as_str().unwrap_or_default();
        let description = schema["description"].as_str().unwrap_or_default();
        println!("{name}\n    {description}");
        if let Some(props) = schema["parameters"]["properties"].as_object() {
            let params: Vec<&str> = props.keys().map(String::as_str).collect();
            println!("    params: {}", params.join(", "));
        }
    }
    app.close().await;
    Ok(())
}

async fn ensure_session(app: &App, user: &str) -> anyhow::Result<()> {
    match app.chat.session(user).await {
        Ok(_) => Ok(()),
        Err(ChatError::NotLoggedIn { .. }) => {
            debug!(user, "no active session, logging in");
            app.chat.login(user).await?;
            Ok(())
        },
        Err(e) => Err(e.into()),
    }
}

/// Serve turns line by line until EOF or `/quit`.
async fn run_lines<R, W>(app: &App, user: &str, reader: R, mut out: W) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut turns = 0;
    out.write_all(PROMPT.as_bytes()).await?;
    out.flush().await?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "/quit" || line == "/exit" {
            break;
        }
        if !line.is_empty() {
            let text = match app.chat.turn(user, line).await {
                Ok(report) => {
                    turns += 1;
                    render_turn(&report)
                },
                Err(e) => format!("error: {e}"),
            };
            out.write_all(text.as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
        out.write_all(PROMPT.as_bytes()).await?;
        out.flush().await?;
    }
    Ok(turns)
}

fn render_turn(report: &TurnReport) -> String {
    let mut text = report.reply.clone();
    for result in &report.results {
        if let Some(events) = result.output.get("events").and_then(Value::as_array) {
            for event in events {
                text.push_str(&format!("\n  {}", event_line(event)));
            }
        }
    }
    text
}

/// One line per event: when, what, and its role in the registry.
pub fn format_row(row: &EventRow) -> String {
    serde_json::to_value(row)
        .map(|v| event_line(&v))
        .unwrap_or_else(|_| row.id.clone())
}

fn event_line(event: &Value) -> String {
    let field = |key: &str| event.get(key).and_then(Value::as_str).unwrap_or_default();
    format!(
        "{} - {}  {} [{}] ({})",
        field("start"),
        field("end"),
        field("summary"),
        field("event_type"),
        field("id")
    )
}

/// Build the `/name {json}` command for a direct tool call.
fn command_line(name: &str, args: &str) -> anyhow::Result<String> {
    let args: Value =
        serde_json::from_str(args).with_context(|| format!("arguments for {name} are not JSON"))?;
    if !args.is_object() {
        anyhow::bail!("arguments for {name} must be a JSON object");
    }
    Ok(format!("/{name} {args}"))
}
