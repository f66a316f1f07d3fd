//! Interactive REPL for chatting with the assistant from a terminal.
//! Optionally takes a seed-data JSON file as its only argument.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aiken::{App, Database, GeminiClient, PersonaConfig, Render, Role, UiEvent};

const DB_FILE: &str = "aiken_user_data.db";
const USER_ID: &str = "ken";

#[tokio::main]
async fn main() -> aiken::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aiken=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing credentials halt startup; everything after this degrades
    // inline instead of crashing.
    let model = GeminiClient::from_env()?;

    let db = Arc::new(Database::open(Path::new(DB_FILE))?);
    if let Some(seed_path) = std::env::args().nth(1) {
        db.bootstrap_from_file(Path::new(&seed_path))?;
    }
    db.ensure_user(USER_ID, "Ken")?;

    let persona = PersonaConfig::default();
    let assistant = persona.assistant_name.clone();
    let counterpart = persona.counterpart_name.clone();

    let mut app = App::new(db, &persona, model, USER_ID);

    for render in app.initial_render() {
        print_render(&render, &assistant, &counterpart);
    }
    println!("(type 'exit' or 'quit' to leave)");

    let stdin = io::stdin();
    loop {
        print!("{}: ", counterpart);
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("{}: Alright, catch you later! Ping me anytime 👍", assistant);
            break;
        }

        let renders = app
            .handle_event(UiEvent::SubmitFreeText(input.to_string()))
            .await;
        for render in &renders {
            // The user's own line is already on screen.
            if matches!(render, Render::AppendTurn(turn) if turn.role == Role::User) {
                continue;
            }
            print_render(render, &assistant, &counterpart);
        }
    }

    Ok(())
}

fn print_render(render: &Render, assistant: &str, counterpart: &str) {
    match render {
        Render::ShowCategories(categories) => {
            let names: Vec<&str> = categories.iter().map(|c| c.display_name.as_str()).collect();
            println!("[categories] {}", names.join(" | "));
        }
        Render::ShowPresets(presets) => {
            for preset in presets {
                println!("[preset {}] {}", preset.knowledge_id, preset.question_text);
            }
        }
        Render::AppendTurn(turn) => {
            let speaker = match turn.role {
                Role::User => counterpart,
                Role::Assistant => assistant,
            };
            println!("{}: {}", speaker, turn.content);
        }
        Render::ShowPlan(plan) => println!("{}", plan),
        Render::ShowError(message) => eprintln!("[error] {}", message),
    }
}
