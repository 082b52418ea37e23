use clap::Parser;
use postgen_client::{GenerationSession, RelayClient};
use postgen_types::{PostType, Prompt};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Generate a LinkedIn post through the postgen relay
#[derive(Debug, Parser)]
#[command(name = "postgen", version, about)]
struct Cli {
    /// Niche or topic the post is about
    #[arg(short, long)]
    niche: String,

    /// motivational, educational, story or tips
    #[arg(short = 't', long, default_value = "motivational")]
    post_type: PostType,

    /// Relay base URL
    #[arg(long, env = "POSTGEN_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Wait for the full post instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Also write the post to DIR/linkedin-post-<type>-<millis>.txt
    #[arg(long, value_name = "DIR")]
    save: Option<PathBuf>,

    /// Cancel the generation after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let prompt = Prompt::build(cli.post_type, &cli.niche)?;
    let mut session = GenerationSession::new(RelayClient::new(&cli.url)?);

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, cli.timeout_secs.map(Duration::from_secs));

    tracing::info!(post_type = %cli.post_type, url = %cli.url, "Generating post");

    let result = if cli.no_stream {
        let result = session.run_blocking(&prompt, &cancel).await;
        if result.is_ok() {
            println!("{}", session.text());
        }
        result
    } else {
        let mut stdout = std::io::stdout();
        let result = session
            .run_streaming(&prompt, &cancel, |fragment, _| {
                let _ = write!(stdout, "{}", fragment.content);
                let _ = stdout.flush();
            })
            .await;
        println!();
        result
    };

    if result.is_err() {
        eprintln!("{}", session.text());
        return Ok(ExitCode::FAILURE);
    }

    if let Some(dir) = &cli.save {
        let path = save_post(dir, cli.post_type, session.text()).await?;
        eprintln!("Saved to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

/// Cancel on Ctrl-C, and after `timeout` if given
fn spawn_cancel_triggers(cancel: &CancellationToken, timeout: Option<Duration>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling generation");
            on_signal.cancel();
        }
    });

    if let Some(timeout) = timeout {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!(?timeout, "Timed out, cancelling generation");
            on_timeout.cancel();
        });
    }
}

fn post_file_name(post_type: PostType, millis: i64) -> String {
    format!("linkedin-post-{post_type}-{millis}.txt")
}

async fn save_post(dir: &Path, post_type: PostType, text: &str) -> anyhow::Result<PathBuf> {
    let name = post_file_name(post_type, chrono::Utc::now().timestamp_millis());
    let path = dir.join(name);
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, text).await?;
    Ok(path)
}
