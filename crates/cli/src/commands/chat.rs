//! `newsdesk chat` / `newsdesk ask` — Interactive or single-message chat.

use std::io::Write;

use newsdesk_agent::SessionStore;
use newsdesk_core::message::ConversationId;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_runtime, check_provider, load_config};

/// Words the interactive loop handles itself instead of sending to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionCommand {
    Exit,
    Clear,
    Tools,
    Skip,
}

impl SessionCommand {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "" => Some(Self::Skip),
            "exit" | "quit" | "q" | "bye" => Some(Self::Exit),
            "clear" | "reset" => Some(Self::Clear),
            "tools" => Some(Self::Tools),
            _ => None,
        }
    }
}

pub async fn ask(message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let runtime = build_runtime(&config)?;
    let mut agent = runtime.new_loop(ConversationId::new());

    eprint!("  Thinking...");
    let reply = agent.process(message).await;
    eprint!("\r              \r");
    println!("{}", reply.content);

    if reply.failed {
        return Err("the model call failed".into());
    }
    Ok(())
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let runtime = build_runtime(&config)?;
    let healthy = check_provider(runtime.provider.as_ref()).await;
    let tool_names: Vec<String> = runtime.tools.names().into_iter().map(String::from).collect();
    let sessions = SessionStore::new(runtime);
    let session = sessions.get_or_create(&ConversationId::new()).await;

    println!();
    println!("  Newsdesk — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Tools:     {}", tool_names.join(", "));
    if !healthy {
        println!("  ⚠️  {} did not answer its health check; replies may fail.", config.default_provider);
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Commands: 'clear' resets the conversation, 'tools' lists tools, 'exit' quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match SessionCommand::parse(&line) {
            Some(SessionCommand::Skip) => continue,
            Some(SessionCommand::Exit) => break,
            Some(SessionCommand::Clear) => {
                session.lock().await.clear();
                println!("  (conversation cleared)");
                println!();
                continue;
            }
            Some(SessionCommand::Tools) => {
                for name in &tool_names {
                    println!("  - {name}");
                }
                println!();
                continue;
            }
            None => {}
        }

        eprint!("  ...");
        let reply = session.lock().await.process(line.trim()).await;
        eprint!("\r     \r");

        println!();
        for result in &reply.tool_results {
            println!("  [{} → {:?}]", result.tool_name, result.status);
        }
        for line in reply.content.lines() {
            println!("  Assistant > {line}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
