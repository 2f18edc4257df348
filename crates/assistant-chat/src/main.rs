//! Terminal chat front end: type a message, watch the streamed reply.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use assistant_stream::prelude::*;
use assistant_stream::init_observability;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, BufReader, Lines};

#[derive(Debug, Parser)]
#[command(name = "assistant-chat", about = "Chat with a hosted assistant over a streamed run")]
struct Cli {
    /// Send a single message and exit. Without it, read one message per line from stdin.
    #[arg(short, long)]
    message: Option<String>,
    /// Continue an existing thread instead of creating one.
    #[arg(long)]
    thread: Option<String>,
    /// Print the newest message of `--thread` without starting a run.
    #[arg(long, requires = "thread")]
    last_message: bool,
    /// Print the final state of each turn as JSON.
    #[arg(long)]
    json: bool,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,
    #[arg(long, env = "OPENAI_ASSISTANT_ID")]
    assistant_id: String,
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,
    /// HTTP timeout for a whole run, stream included.
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

impl Cli {
    fn config(&self) -> AssistantConfig {
        let mut config = AssistantConfig::new(&self.api_key, &self.assistant_id)
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(base_url) = self.base_url.as_deref().filter(|url| !url.trim().is_empty()) {
            config = config.base_url(base_url);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_observability();
    let cli = Cli::parse();

    let client = AssistantClient::new(cli.config())?;
    let mut conversation = Conversation::new(Arc::new(client));
    if let Some(thread_id) = cli.thread.as_deref() {
        conversation = conversation.with_thread(thread_id);
    }

    if cli.last_message {
        match conversation.refresh_latest_message().await? {
            Some(text) => println!("{text}"),
            None => println!("(no messages)"),
        }
        return Ok(());
    }

    if let Some(message) = cli.message.as_deref() {
        run_turn(&mut conversation, message, cli.json).await?;
        return Ok(());
    }

    // ctrl_c() replaces the default SIGINT handler, so the prompt listens for
    // it as well. EOF also quits.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
            println!();
            break;
        };
        if let Err(err) = run_turn(&mut conversation, &line, cli.json).await {
            eprintln!("error: {err}");
        }
    }
    Ok(())
}

/// Reads the next REPL line. Returns `None` on EOF or once `quit` resolves.
async fn next_input<R, Q>(lines: &mut Lines<R>, quit: Q) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    Q: Future,
{
    tokio::select! {
        biased;
        _ = quit => Ok(None),
        line = lines.next_line() => line,
    }
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

/// Runs one turn, printing fragments as they arrive. Ctrl-C aborts the turn.
async fn run_turn(
    conversation: &mut Conversation,
    message: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut updates = conversation.subscribe();
    let abort = conversation.abort_handle();
    let mut printed = 0;
    let mut announced_loading = false;

    let outcome = {
        let send = conversation.send(message);
        tokio::pin!(send);
        loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                changed = updates.changed() => {
                    if changed.is_err() {
                        continue;
                    }
                    let state = updates.borrow_and_update().clone();
                    if state.is_loading && !announced_loading {
                        eprint!("Loading...");
                        announced_loading = true;
                    }
                    print_new_fragments(&state, &mut printed)?;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("abort requested");
                    abort.abort();
                }
            }
        }
    };
    if announced_loading {
        eprintln!();
    }

    let state = conversation.state().clone();
    print_new_fragments(&state, &mut printed)?;
    if printed == 0
        && let Some(complete) = state.transcript.complete()
    {
        print!("{complete}");
    }
    println!();

    let outcome = outcome?;
    if outcome == ConsumeOutcome::Aborted {
        eprintln!("(aborted)");
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }
    Ok(())
}

fn print_new_fragments(state: &AssemblerState, printed: &mut usize) -> std::io::Result<()> {
    let fragments = state.transcript.fragments();
    if fragments.len() <= *printed {
        return Ok(());
    }
    let mut stdout = std::io::stdout();
    for fragment in &fragments[*printed..] {
        write!(stdout, "{fragment}")?;
    }
    *printed = fragments.len();
    stdout.flush()
}
