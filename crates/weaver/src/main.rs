use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use weaver_engine::backend::Backend;
use weaver_engine::config::ConfigLoader;
use weaver_engine::formatter::format_message;
use weaver_engine::protocol::ControlMessage;
use weaver_engine::recorder::Recorder;
use weaver_engine::session::{SessionCommand, run_session};
use weaver_engine::sink::{CaptureSink, ChannelSink, JsonlWriter};
use weaver_engine::store::{FileStore, MemoryStore, SessionStore};
use weaver_h::backend::HeadlessBackend;
use weaver_r::backend::RemoteBackend;

#[derive(Parser)]
#[command(name = "weaver", version, about = "Weaver interaction recorder")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// JSONL capture log (overrides the config file)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Begin recording immediately instead of waiting for 'start'
    #[arg(long)]
    record: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Capture from a headless browser (Chromium) via CDP
    Headless {
        /// Launch browser in visible mode (not headless)
        #[arg(long)]
        visible: bool,

        /// Page to open before the session starts
        #[arg(long)]
        url: Option<String>,
    },
    /// Capture from a browser extension connected via WebSocket
    Remote {
        /// WebSocket port
        #[arg(long, default_value_t = 9001)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging goes to stderr; stdout carries the capture stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };

    let mut backend: Box<dyn Backend> = match &args.mode {
        Mode::Headless { visible, .. } => Box::new(HeadlessBackend::new_with_visibility(*visible)),
        Mode::Remote { port } => Box::new(RemoteBackend::new(*port)),
    };

    if let Err(e) = backend.launch().await {
        eprintln!("Failed to launch backend: {}", e);
        return Err(e.into());
    }

    if let Mode::Headless { url: Some(url), .. } = &args.mode {
        backend.navigate(&normalize_url(url)).await?;
    }

    let store: Box<dyn SessionStore> = match config.state_file() {
        Some(path) => Box::new(FileStore::new(path)),
        None => Box::new(MemoryStore::default()),
    };

    let output_path = args.output.clone().or_else(|| config.output.clone());
    let mut log_writer = match &output_path {
        Some(path) => Some(JsonlWriter::create(path).await?),
        None => None,
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (msg_tx, mut msg_rx) = mpsc::channel(256);
    let poll_interval = config.poll_interval();

    let session = tokio::spawn(async move {
        let mut recorder = Recorder::restore(store.as_ref()).await;
        let mut sink = ChannelSink::new(msg_tx);
        let result = run_session(
            backend.as_mut(),
            &mut recorder,
            store.as_ref(),
            &mut sink,
            cmd_rx,
            poll_interval,
        )
        .await;
        if let Err(e) = backend.close().await {
            tracing::warn!("Backend close failed: {}", e);
        }
        result
    });

    if args.record {
        cmd_tx
            .send(SessionCommand::Control(ControlMessage::StartRecording))
            .await
            .ok();
    }

    println!("Session open. Type 'start' to begin recording, 'stop' to pause.");
    println!("Captured interactions stream here; logs go to stderr.");
    println!("Type 'exit' or 'quit' to close.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            message = msg_rx.recv() => {
                match message {
                    Some(message) => {
                        println!("{}", format_message(&message));
                        if let Some(writer) = log_writer.as_mut() {
                            if let Err(e) = writer.emit(message).await {
                                tracing::warn!("Could not write capture log: {}", e);
                            }
                        }
                    }
                    None => break,
                }
            }

            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        cmd_tx.send(SessionCommand::Shutdown).await.ok();
                        break;
                    }
                };
                if !handle_line(line.trim(), &cmd_tx).await {
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                cmd_tx.send(SessionCommand::Shutdown).await.ok();
                break;
            }
        }
    }

    // Print captures that were still in flight while shutting down.
    while let Some(message) = msg_rx.recv().await {
        println!("{}", format_message(&message));
        if let Some(writer) = log_writer.as_mut() {
            writer.emit(message).await.ok();
        }
    }

    session.await??;
    Ok(())
}

/// Returns false when the session loop should end.
async fn handle_line(line: &str, cmd_tx: &mpsc::Sender<SessionCommand>) -> bool {
    if line.is_empty() {
        return true;
    }

    let command = if line == "start" {
        SessionCommand::Control(ControlMessage::StartRecording)
    } else if line == "stop" {
        SessionCommand::Control(ControlMessage::StopRecording)
    } else if line == "status" {
        SessionCommand::Status
    } else if line == "exit" || line == "quit" {
        SessionCommand::Shutdown
    } else if let Some(url) = line.strip_prefix("goto ") {
        SessionCommand::Navigate(normalize_url(url.trim()))
    } else {
        eprintln!("Commands: start, stop, goto <url>, status, exit");
        return true;
    };

    let is_shutdown = command == SessionCommand::Shutdown;
    if cmd_tx.send(command).await.is_err() {
        return false;
    }
    !is_shutdown
}

/// Bare hostnames are convenient at the prompt; default them to https.
fn normalize_url(input: &str) -> String {
    match url::Url::parse(input) {
        Ok(parsed) => String::from(parsed),
        Err(_) => format!("https://{}", input),
    }
}
