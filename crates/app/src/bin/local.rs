// gemchat - Local Console

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use gemchat_app::{telemetry, ChatApp};
use gemchat_common::config::Config;
use gemchat_conversations::{Conversation, ConversationId};

const HELP: &str = "\
Commands:
  /new                 open a new chat
  /chat <id>           switch to (or create) a chat
  /clear               clear the current chat
  /settings <key> <model>
                       save API key and model
  /model <model>       change the model
  /models              list available models
  /help                show this help
  /quit                exit
Anything else is sent to the current chat.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    telemetry::init_tracing(&config.rust_log);

    info!("Starting gemchat local console");

    let app = ChatApp::from_config(&config).map_err(|e| {
        error!("Failed to create application: {}", e);
        e
    })?;

    let (mut current, _) = app.new_chat();
    println!("{}\n\nChat {} selected.", HELP, current);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some("/quit") => break,
            Some("/help") => println!("{}", HELP),
            Some("/new") => {
                current = app.new_chat().0;
                println!("Chat {} selected.", current);
            }
            Some("/chat") => match words.next() {
                Some(id) => {
                    current = ConversationId::from(id);
                    let conversation = app.select_chat(&current);
                    print_transcript(&conversation);
                }
                None => println!("Usage: /chat <id>"),
            },
            Some("/clear") => match app.clear_chat(&current) {
                Ok(_) => println!("Chat {} cleared.", current),
                Err(e) => println!("Error: {}", e),
            },
            Some("/settings") => match (words.next(), words.next()) {
                (Some(key), Some(model)) => match app.save_settings(key, model) {
                    Ok(settings) => println!("Saved. Model: {}", settings.model().unwrap_or("-")),
                    Err(e) => println!("{}", e),
                },
                _ => println!("Usage: /settings <key> <model>"),
            },
            Some("/model") => match words.next() {
                Some(model) => match app.set_model(model) {
                    Ok(settings) => println!("Model: {}", settings.model().unwrap_or("-")),
                    Err(e) => println!("{}", e),
                },
                None => println!("Usage: /model <model>"),
            },
            Some("/models") => match app.available_models().await {
                Ok(models) => {
                    for model in models {
                        println!("  {:<40} {}", model.name, model.display_name);
                    }
                }
                Err(e) => println!("Error: {}", e),
            },
            _ => match app.send_message(&current, line).await {
                Ok(conversation) => print_last(&conversation),
                Err(e) => println!("Error: {}", e),
            },
        }
    }

    info!("Console closed");
    Ok(())
}

fn print_transcript(conversation: &Arc<Conversation>) {
    println!("Chat {} ({} messages)", conversation.id, conversation.messages().len());
    for message in conversation.messages() {
        println!("[{}] {}: {}", message.timestamp(), message.sender, message.text);
    }
}

fn print_last(conversation: &Arc<Conversation>) {
    if let Some(error) = conversation.error() {
        println!("Error: {}", error);
        return;
    }
    if let Some(message) = conversation.messages().last() {
        println!("[{}] {}: {}", message.timestamp(), message.sender, message.text);
    }
}
