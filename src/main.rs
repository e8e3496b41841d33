use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use echo_sync::config::{SyncConfig, APP_NAME};
use echo_sync::models::ConversationId;
use echo_sync::services::{Database, TitleOverrideStore};
use echo_sync::transport::{HttpTransport, TokenAuth};
use echo_sync::{SendOutcome, SyncController, SyncEvent, SyncView};

const HELP: &str = "\
/list              show conversations
/open <n>          select conversation n
/new               start a new conversation
/create <title>    create a conversation on the server
/rename <title>    rename the active conversation
/refresh           reload the conversation list
/quit              exit
anything else      send it as a message";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = SyncConfig::from_env()?;
    let auth = Arc::new(TokenAuth::new(config.api_token.clone()));
    let transport = Arc::new(HttpTransport::new(config.api_base_url.clone(), auth.clone()));
    let db = Database::open(&config.database_path)?;
    let titles = TitleOverrideStore::open(Box::new(db));

    let (controller, mut events) = SyncController::new(&config, transport, auth, titles);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SyncEvent::Error(error) => eprintln!("! {}", error),
                SyncEvent::SendFailed { content, error } => {
                    eprintln!("! {} (not sent: {:?})", error, content)
                }
                _ => {}
            }
        }
    });

    println!("{} - /help for commands", APP_NAME);
    controller.on_mount().await;
    print_conversations(&controller.view());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !handle_line(&controller, line).await {
            break;
        }
    }

    Ok(())
}

/// Returns false when the user asked to quit.
async fn handle_line(controller: &SyncController, line: &str) -> bool {
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" => return false,
        "/help" => println!("{}", HELP),
        "/list" => print_conversations(&controller.view()),
        "/refresh" => {
            if controller.refresh().await.is_ok() {
                print_conversations(&controller.view());
            }
        }
        "/new" => {
            controller.on_new_conversation();
            println!("Started a new conversation");
        }
        "/create" => match controller.create_conversation(arg).await {
            Ok(_) => print_conversations(&controller.view()),
            Err(e) => eprintln!("! {}", e),
        },
        "/open" => match select_by_index(controller, arg) {
            Some(id) => {
                if controller.on_conversation_selected(id).await.is_ok() {
                    print_messages(&controller.view());
                }
            }
            None => eprintln!("! No conversation {}", arg),
        },
        "/rename" => match controller.view().active {
            Some(id) => match controller.on_rename(&id, arg) {
                Ok(()) => println!("Renamed to {}", arg),
                Err(e) => eprintln!("! {}", e),
            },
            None => eprintln!("! No active conversation"),
        },
        _ => send(controller, line).await,
    }
    true
}

async fn send(controller: &SyncController, content: &str) {
    let handle = match controller.on_send(content) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("! {}", e);
            return;
        }
    };

    // The optimistic echo is already part of the view at this point.
    println!("you: {}", content);

    match handle.await {
        Ok(SendOutcome::Delivered { .. }) => {
            if let Some(reply) = controller
                .view()
                .messages
                .last()
                .filter(|m| m.role == echo_sync::models::Role::Assistant)
            {
                println!("assistant: {}", reply.content);
            }
        }
        Ok(SendOutcome::RolledBack { .. }) => {}
        Err(e) => tracing::error!("Send task failed: {}", e),
    }
}

fn select_by_index(controller: &SyncController, arg: &str) -> Option<ConversationId> {
    let index: usize = arg.parse().ok()?;
    controller
        .view()
        .conversations
        .get(index.checked_sub(1)?)
        .map(|c| c.id.clone())
}

fn print_conversations(view: &SyncView) {
    if view.conversations.is_empty() {
        println!("(no conversations)");
        return;
    }
    for (i, conversation) in view.conversations.iter().enumerate() {
        let marker = if view.active.as_ref() == Some(&conversation.id) {
            '*'
        } else {
            ' '
        };
        println!("{} {:>2}. {}", marker, i + 1, conversation.title);
    }
}

fn print_messages(view: &SyncView) {
    for message in &view.messages {
        println!("{}: {}", message.role.as_str(), message.content);
    }
}
