//! Interactive chat against a running chatrelay-server.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local server with a fresh session
//! chatrelay-chat
//!
//! # Resume a session on another host and print replies as markup
//! chatrelay-chat --server http://relay.example.com/api/ --session session_1700000000000_k3j9x0a2b --html
//! ```
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/clear` - Clear the conversation here and on the server
//! - `/session` - Show the session id
//! - `/html on|off` - Toggle markup output
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use chatrelay::chat::{
    ChatArgs, ChatClient, ChatCommand, ChatConfig, HttpTransport, help_text, parse_command,
};
use chatrelay::types::Message;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("chatrelay-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let mut show_markup = config.show_markup;

    let transport = HttpTransport::new(&config.server_url, Some(config.request_timeout))?;
    let mut client = match config.session_id {
        Some(session_id) => ChatClient::with_session_id(transport, session_id),
        None => ChatClient::new(transport),
    };
    let mut rl = DefaultEditor::new()?;

    println!("Chat relay ({})", config.server_url);
    println!("Session: {}", client.session_id());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            client.clear().await;
                            println!("    Conversation cleared.");
                        }
                        ChatCommand::Session => {
                            println!("    Session: {}", client.session_id());
                        }
                        ChatCommand::Markup(on) => {
                            show_markup = on;
                            if on {
                                println!("    Printing replies as markup.");
                            } else {
                                println!("    Printing replies as plain text.");
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            eprintln!("    Error: {}", message);
                        }
                    }
                    continue;
                }

                match client.submit(line).await {
                    Ok(reply) => print_reply(reply, show_markup),
                    Err(e) => eprintln!("    Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Input error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

fn print_reply(reply: &Message, show_markup: bool) {
    println!("Assistant:");
    if show_markup {
        println!("{}", chatrelay::render(&reply.content));
    } else {
        println!("{}", reply.content);
    }
    println!();
}
