use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use seeksense::SeekSense;
use seeksense::chat::{ChatController, SendOutcome};
use seeksense::config::{Config, SessionBackend};
use seeksense::display;
use seeksense::product::LoadOutcome;
use seeksense::routes::Route;
use seeksense::search::SearchOutcome;

#[derive(Parser)]
#[command(name = "seeksense")]
#[command(about = "Search and chat over product reviews", version)]
struct Args {
    /// Backend base URL (overrides config and SEEKSENSE_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Transcript key to read and write
    #[arg(long)]
    session_key: Option<String>,

    /// Keep the transcript in memory only
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search reviews and print them as a table
    Search { query: Vec<String> },
    /// Interactive chat
    Chat,
    /// Send one chat message and print the reply
    Ask { query: Vec<String> },
    /// Print the saved chat transcript
    History,
    /// Reset the chat transcript to the welcome message
    Clear,
    /// Show every review row for a clothing id
    Product { id: u32 },
    /// Open a screen by path: /, /chat, /product/<id>
    Open {
        #[arg(value_parser = parse_route)]
        route: Route,
        /// Query for the search screen
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seeksense=info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load();
    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }
    if let Some(key) = args.session_key {
        config.session.key = key;
    }
    if args.ephemeral {
        config.session.backend = SessionBackend::Memory;
    }

    let app = SeekSense::new(&config).await?;

    match args.command {
        Command::Search { query } => run_search(&app, &query.join(" ")).await,
        Command::Chat => run_chat(&app).await?,
        Command::Ask { query } => {
            let mut chat = app.chat().await;
            send_and_print(&mut chat, &query.join(" ")).await;
        }
        Command::History => {
            let chat = app.chat().await;
            println!("{}", display::render_transcript(chat.session().messages()));
        }
        Command::Clear => {
            let mut chat = app.chat().await;
            chat.clear().await;
            chat.session().flush().await?;
            println!("{}", display::render_transcript(chat.session().messages()));
        }
        Command::Product { id } => run_product(&app, id).await,
        Command::Open { route, query } => match route {
            Route::Search => run_search(&app, &query.join(" ")).await,
            Route::Chat => run_chat(&app).await?,
            Route::Product(id) => run_product(&app, id).await,
        },
    }

    Ok(())
}

fn parse_route(raw: &str) -> std::result::Result<Route, String> {
    Route::parse(raw).map_err(|e| e.to_string())
}

async fn run_search(app: &SeekSense, query: &str) {
    let mut view = app.search_view();
    if let SearchOutcome::Failed = view.search(query).await {
        tracing::debug!("Search failed; showing previous results");
    }
    if let Some(summary) = view.summary() {
        println!("{summary}");
    }
    println!("{}", display::render_table(&view.rows()));
}

async fn run_product(app: &SeekSense, id: u32) {
    let mut view = app.product_view();
    if view.load(id).await == LoadOutcome::Failed {
        // No retry; the failure is in the log
        return;
    }
    println!("{}", display::render_product_state(view.state()));
}

async fn send_and_print(chat: &mut ChatController, query: &str) {
    if chat.send(query).await != SendOutcome::Ignored {
        println!("{}", display::render_transcript(chat.session().last_reply()));
    }
}

async fn run_chat(app: &SeekSense) -> Result<()> {
    let mut chat = app.chat().await;
    println!("{}", display::render_transcript(chat.session().messages()));
    println!("(commands: /clear, /history, /product <id>, /quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("› ");
        std::io::stdout().flush()?;

        // Input is not read again until the previous send has resolved
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim_end();

        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                chat.clear().await;
                println!("{}", display::render_transcript(chat.session().messages()));
            }
            "/history" => {
                println!("{}", display::render_transcript(chat.session().messages()));
            }
            cmd if cmd.starts_with("/product") => {
                match cmd.trim_start_matches("/product").trim().parse::<u32>() {
                    Ok(id) => run_product(app, id).await,
                    Err(_) => println!("usage: /product <id>"),
                }
            }
            _ => {
                send_and_print(&mut chat, line).await;
            }
        }
    }

    chat.session().flush().await?;
    Ok(())
}
