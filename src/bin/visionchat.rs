use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use spinners::{Spinner, Spinners};
use visionchat::api::Server;
use visionchat::chat::{ChatTransport, Conversation, Submission, SubmitOutcome};
use visionchat::client::HttpTransport;
use visionchat::config::ServerConfig;
use visionchat::secret_store::SecretStore;

/// Command line arguments for the visionchat binary
#[derive(Parser)]
#[clap(
    name = "visionchat",
    about = "Chat with Google Gemini about text and images"
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to bind, overrides VISIONCHAT_ADDR
        #[arg(long)]
        addr: Option<String>,
    },
    /// Chat with a running server
    Chat {
        /// Base URL of the server
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,
        /// Image to attach to the first message
        #[arg(long)]
        image: Option<PathBuf>,
        /// Send a single prompt and print the reply
        prompt: Option<String>,
    },
    /// Store a secret (e.g. GEMINI_API_KEY)
    Set { key: String, value: String },
    /// Print a stored secret
    Get { key: String },
    /// Delete a stored secret
    Delete { key: String },
}

fn print_separator() {
    println!("{}", "─".repeat(50).bright_black());
}

/// Submits the pending input while showing a spinner, then prints the outcome.
async fn submit_and_print(conversation: &mut Conversation, transport: &HttpTransport) {
    let turns = match conversation.begin_submission() {
        Submission::Ready(turns) => turns,
        Submission::Empty => return,
        Submission::Busy => {
            eprintln!("{} a request is already in flight", "!".bright_yellow());
            return;
        }
    };

    let mut sp = Spinner::new(Spinners::Dots12, "Thinking...".bright_magenta().to_string());
    let result = transport.send(&turns).await;
    sp.stop();
    print!("\r\x1B[K");

    let outcome = conversation.finish_submission(result);
    let reply = conversation
        .turns()
        .last()
        .map(|turn| turn.text().to_string())
        .unwrap_or_default();
    match outcome {
        SubmitOutcome::Failed(message) => {
            eprintln!("{} {}", "Error:".bright_red(), message);
            println!("{} {}", "> Assistant:".bright_red(), reply);
        }
        _ => println!("{} {}", "> Assistant:".bright_green(), reply),
    }
    print_separator();
}

async fn run_chat(
    url: String,
    image: Option<PathBuf>,
    prompt: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = HttpTransport::new(&url);
    let mut conversation = Conversation::new();

    if let Some(path) = image {
        conversation.attach_image_file(&path)?;
    }

    let is_pipe = !io::stdin().is_terminal();
    if is_pipe || prompt.is_some() {
        let text = match prompt {
            Some(p) => p,
            None => {
                let mut input = String::new();
                io::stdin().read_to_string(&mut input)?;
                input
            }
        };
        conversation.set_input(text);
        match conversation.submit(&transport).await {
            SubmitOutcome::Answered => {
                if let Some(turn) = conversation.turns().last() {
                    println!("{}", turn.text());
                }
            }
            SubmitOutcome::Failed(message) => eprintln!("Error: {}", message),
            SubmitOutcome::Empty | SubmitOutcome::Busy => {}
        }
        return Ok(());
    }

    println!("{}", "visionchat - Interactive Chat".bright_cyan());
    println!("Server: {}", url.bright_green());
    println!(
        "{}",
        "Commands: /image <path>, /cancel, exit".bright_black()
    );
    print_separator();

    let mut rl = DefaultEditor::new()?;

    loop {
        io::stdout().flush()?;
        let prompt = if conversation.pending_image().is_some() {
            "[image] > "
        } else {
            "> "
        };
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.eq_ignore_ascii_case("exit") {
                    println!("{}", "Goodbye!".bright_cyan());
                    break;
                }
                if !trimmed.is_empty() {
                    let _ = rl.add_history_entry(trimmed);
                }

                if let Some(path) = trimmed.strip_prefix("/image ") {
                    match conversation.attach_image_file(path.trim()) {
                        Ok(()) => println!("{} image attached", "✓".bright_green()),
                        Err(_) => eprintln!(
                            "{} {}",
                            "Error:".bright_red(),
                            conversation.error().unwrap_or_default()
                        ),
                    }
                    continue;
                }
                if trimmed == "/cancel" {
                    conversation.cancel_image();
                    println!("{} image removed", "✓".bright_green());
                    continue;
                }

                conversation.set_input(trimmed);
                submit_and_print(&mut conversation, &transport).await;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\n{}", "Goodbye!".bright_cyan());
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".bright_red(), err);
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    visionchat::init_logging();
    let args = CliArgs::parse();

    match args.command {
        Command::Serve { addr } => {
            let mut config = ServerConfig::from_env()?;
            if let Some(addr) = addr {
                config.addr = addr;
            }
            let handler = config.build_handler()?;
            println!(
                "{} listening on {}",
                "visionchat".bright_cyan(),
                config.addr.bright_green()
            );
            Server::new(handler).run(&config.addr).await?;
        }
        Command::Chat { url, image, prompt } => run_chat(url, image, prompt).await?,
        Command::Set { key, value } => {
            let mut store = SecretStore::new()?;
            store.set(&key, &value)?;
            println!("{} Secret '{}' has been set.", "✓".bright_green(), key);
        }
        Command::Get { key } => {
            let store = SecretStore::new()?;
            match store.get(&key) {
                Some(value) => println!("{}: {}", key, value),
                None => println!("{} Secret '{}' not found", "!".bright_yellow(), key),
            }
        }
        Command::Delete { key } => {
            let mut store = SecretStore::new()?;
            store.delete(&key)?;
            println!("{} Secret '{}' has been deleted.", "✓".bright_green(), key);
        }
    }

    Ok(())
}
