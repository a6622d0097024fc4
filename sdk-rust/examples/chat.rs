use aideas_sdk::{
    looks_like_idea_envelope,
    openai::{OpenAIChatBackend, OpenAIChatBackendOptions},
    validate_api_key_input, validate_prompt_input, AppContext, AppContextOptions, ChatSession,
    FileStore, IdeaServiceMode, KeyValueStore, GREETING,
};
use dotenvy::dotenv;
use std::{
    env,
    io::{self, Write},
    sync::Arc,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "Commands:
  /ideas          list saved ideas
  /save           save the ideas from the last reply
  /clear          delete all saved ideas
  /key [KEY]      set a new API key (or forget the current one)
  /login TOKEN    store ideas in your account
  /logout         store ideas on this device
  /quit           exit";

// Terminal front end for the ideas chat. Reads prompts from stdin and streams
// replies as they arrive.
#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let store: Arc<dyn KeyValueStore> = match env::var("AIDEAS_DATA_DIR") {
        Ok(dir) => Arc::new(FileStore::new(dir)),
        Err(_) => Arc::new(FileStore::in_default_dir()?),
    };

    let backend = OpenAIChatBackend::new(
        env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        OpenAIChatBackendOptions {
            base_url: env::var("OPENAI_BASE_URL").ok(),
            ..Default::default()
        },
    );

    let context = AppContext::new(AppContextOptions {
        store,
        api_base_url: env::var("AIDEAS_API_URL")
            .unwrap_or_else(|_| "http://localhost:4000".to_string()),
        backend: Arc::new(backend),
        api_key: env::var("OPENAI_API_KEY").ok(),
    });

    if let Ok(token) = env::var("AIDEAS_SESSION_TOKEN") {
        context.sign_in(token);
    }

    let session = context.chat_session();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("AIdeas is a chatbot that helps you generate ideas.");
    println!("{GREETING}");
    println!("{HELP}");

    loop {
        if context.credentials().is_missing() {
            print!("Set your OpenAI API key: ");
        } else {
            print!("> ");
        }
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if context.credentials().is_missing() {
            match validate_api_key_input(line) {
                Ok(()) => context.credentials().set_api_key(line),
                Err(message) => println!("{message}"),
            }
            continue;
        }

        let (command, argument) = line
            .split_once(' ')
            .map_or((line, ""), |(command, argument)| (command, argument.trim()));

        match command {
            "/quit" => break,
            "/help" => println!("{HELP}"),
            "/ideas" => {
                let ideas = context.ideas().ideas().await;
                let location = match context.selector().mode() {
                    IdeaServiceMode::Local => "on this device",
                    IdeaServiceMode::Remote => "in your account",
                };
                println!("{} ideas saved {location}", ideas.len());
                for idea in ideas {
                    println!("  - {} ({})", idea.idea, idea.context);
                }
            }
            "/save" => match session.last_reply() {
                Some(reply) => match context.ideas().add_raw_ideas(&reply).await {
                    Ok(()) => println!("Saved ideas"),
                    Err(error) => println!("Failed to save ideas: {error}"),
                },
                None => println!("Nothing to save yet"),
            },
            "/clear" => match context.ideas().reset_ideas().await {
                Ok(()) => println!("Cleared ideas"),
                Err(error) => println!("Failed to clear ideas: {error}"),
            },
            "/key" => {
                if argument.is_empty() {
                    context.credentials().clear();
                } else if let Err(message) = validate_api_key_input(argument) {
                    println!("{message}");
                } else {
                    context.credentials().set_api_key(argument);
                }
            }
            "/login" if !argument.is_empty() => {
                context.sign_in(argument);
                println!("Ideas are now stored in your account");
            }
            "/logout" => {
                context.sign_out();
                println!("Ideas are now stored on this device");
            }
            _ if command.starts_with('/') => println!("{HELP}"),
            _ => {
                if let Err(message) = validate_prompt_input(line) {
                    println!("{message}");
                    continue;
                }
                run_turn(&session, line).await?;
            }
        }
    }

    Ok(())
}

/// Send one prompt and echo the reply as it streams in.
async fn run_turn(session: &ChatSession, prompt: &str) -> io::Result<()> {
    let mut updates = session.subscribe();
    let turn = session.send_prompt(prompt);
    tokio::pin!(turn);

    let mut printed = 0;
    let result = loop {
        tokio::select! {
            result = &mut turn => break result,
            changed = updates.changed() => {
                if changed.is_err() {
                    continue;
                }
                let partial = updates.borrow_and_update().partial.clone();
                if partial.len() > printed {
                    print!("{}", &partial[printed..]);
                    io::stdout().flush()?;
                    printed = partial.len();
                }
            }
        }
    };

    match result {
        Ok(reply) => {
            println!("{}", reply.get(printed..).unwrap_or_default());
            if looks_like_idea_envelope(&reply) {
                println!("(type /save to keep these ideas)");
            }
        }
        Err(error) => {
            println!();
            println!("Chat failed: {error}");
        }
    }
    Ok(())
}
