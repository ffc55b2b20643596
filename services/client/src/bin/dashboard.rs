//! services/client/src/bin/dashboard.rs

use clap::{Args, Parser, Subcommand, ValueEnum};
use client_lib::{
    app::{
        auth::{self, login_error_message},
        require_auth, sessions_feed, today_feed, topics_feed, view, AppState, ChatState,
    },
    config::Config,
    error::ClientError,
};
use research_dashboard_core::domain::{
    ChatEntry, Credentials, SessionId, TopicId, TopicQuery, TopicSort,
};
use research_dashboard_core::ports::PortError;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dashboard", about = "Terminal client for the research topic dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the access token
    Login(CredentialArgs),
    /// Create an account (does not sign in)
    Register(CredentialArgs),
    /// Forget the stored access token
    Logout,
    /// Today's digest and your recent chats
    Home,
    /// List topics, or today's digest with --today
    Topics(TopicArgs),
    /// Show a single topic
    Topic { id: String },
    /// List your chat sessions
    Sessions,
    /// Print the messages of a session
    History { id: String },
    /// Archive a session
    Archive { id: String },
    /// Chat globally, about one topic, or continue a session
    Chat {
        #[arg(long, conflicts_with = "session")]
        topic: Option<String>,
        #[arg(long)]
        session: Option<String>,
    },
}

#[derive(Args)]
struct CredentialArgs {
    #[arg(long)]
    email: String,
    /// Read from stdin when omitted
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args)]
struct TopicArgs {
    #[arg(long)]
    today: bool,
    #[arg(long)]
    tag: Option<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, value_enum)]
    sort: Option<SortArg>,
    #[arg(long)]
    asc: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Trendiness,
    TechnicalDepth,
    Practicality,
    CreatedAt,
}

impl From<SortArg> for TopicSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Trendiness => TopicSort::Trendiness,
            SortArg::TechnicalDepth => TopicSort::TechnicalDepth,
            SortArg::Practicality => TopicSort::Practicality,
            SortArg::CreatedAt => TopicSort::CreatedAt,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. API at {}", config.api_base_url);

    // --- 2. Build the Shared AppState ---
    let state = AppState::from_config(config)?;

    // --- 3. Run the Command ---
    match cli.command {
        Command::Login(args) => run_login(&state, args).await,
        Command::Register(args) => run_register(&state, args).await,
        Command::Logout => {
            auth::logout(&state.auth)?;
            println!("Signed out.");
            Ok(())
        }
        command => {
            // Everything past the login screen needs the flag.
            if require_auth(&state.auth).is_err() {
                eprintln!("Not signed in. Run `dashboard login --email <email>` first.");
                return Err(PortError::Unauthorized.into());
            }
            run_protected(&state, command).await
        }
    }
}

async fn read_password(password: Option<String>) -> Result<String, ClientError> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines
        .next_line()
        .await?
        .map(|line| line.trim_end().to_string())
        .ok_or_else(|| ClientError::Internal("no password given".to_string()))
}

async fn run_login(state: &AppState, args: CredentialArgs) -> Result<(), ClientError> {
    let credentials = Credentials {
        email: args.email,
        password: read_password(args.password).await?,
    };
    match auth::login(state.api.as_ref(), &state.auth, &credentials).await {
        Ok(()) => {
            println!("Signed in as {}.", credentials.email);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", login_error_message(&e));
            Err(e.into())
        }
    }
}

async fn run_register(state: &AppState, args: CredentialArgs) -> Result<(), ClientError> {
    let credentials = Credentials {
        email: args.email,
        password: read_password(args.password).await?,
    };
    let user = auth::register(state.api.as_ref(), &credentials).await?;
    println!("Registered {} (id {}). Now run `dashboard login`.", user.email, user.id);
    Ok(())
}

async fn run_protected(state: &AppState, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Home => {
            let mut digest = today_feed(state.api.clone());
            let mut sidebar = sessions_feed(state.api.clone());
            let (today, sessions) = futures::join!(digest.settled(), sidebar.settled());
            println!("{}", view::home(&today, &sessions));
        }
        Command::Topics(args) if args.today => {
            let digest = today_feed(state.api.clone()).settled().await;
            match digest.error {
                Some(error) => eprintln!("{}", error),
                None => println!("{}", view::today_digest(&digest.data)),
            }
        }
        Command::Topics(args) => {
            let query = TopicQuery {
                tag: args.tag,
                search: args.search,
                date: None,
                sort_by: args.sort.map(TopicSort::from),
                ascending: args.asc.then_some(true),
            };
            let topics = topics_feed(state.api.clone(), query).settled().await;
            match topics.error {
                Some(error) => eprintln!("{}", error),
                None => println!("{}", view::topic_list(&topics.data)),
            }
        }
        Command::Topic { id } => {
            let topic = state.api.get_topic(&TopicId::new(id)).await?;
            println!("{}", view::topic_card(&topic, false));
        }
        Command::Sessions => {
            let sessions = sessions_feed(state.api.clone()).settled().await;
            match sessions.error {
                Some(error) => eprintln!("{}", error),
                None if sessions.data.is_empty() => println!("No chats yet."),
                None => {
                    for session in &sessions.data {
                        println!("{}", view::session_line(session));
                    }
                }
            }
        }
        Command::History { id } => {
            let messages = state.api.list_messages(&SessionId::new(id)).await?;
            for message in messages {
                println!("{}", view::chat_entry(&ChatEntry::Confirmed(message)));
            }
        }
        Command::Archive { id } => {
            let session_id = SessionId::new(id);
            state.api.archive_session(&session_id).await?;
            println!("Archived session {}.", session_id);
        }
        Command::Chat { topic, session } => {
            let chat = open_chat(state, topic, session).await?;
            run_chat(&chat).await?;
        }
        Command::Login(_) | Command::Register(_) | Command::Logout => {}
    }
    Ok(())
}

async fn open_chat(
    state: &AppState,
    topic: Option<String>,
    session: Option<String>,
) -> Result<ChatState, ClientError> {
    if let Some(session_id) = session.map(SessionId::new) {
        let chat = ChatState::open(state.api.clone(), &session_id).await?;
        for entry in chat.entries() {
            println!("{}", view::chat_entry(&entry));
        }
        return Ok(chat);
    }

    let (chat, topic) = ChatState::start(state.api.clone(), topic.map(TopicId::new)).await;
    println!("assistant> {}", view::chat_greeting(topic.as_ref()));
    Ok(chat)
}

async fn run_chat(chat: &ChatState) -> Result<(), ClientError> {
    eprintln!("Type a message and press enter. /quit or Ctrl-D to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/quit" {
            break;
        }
        if let Some(reply) = chat.send_message(&line).await {
            println!("{}", view::chat_entry(&ChatEntry::Confirmed(reply)));
        }
        if let Some(error) = chat.error() {
            eprintln!("{}", error);
        }
    }
    if let Some(session_id) = chat.session_id() {
        match chat.topic_id() {
            Some(topic_id) => info!("Leaving chat session {} on topic {}", session_id, topic_id),
            None => info!("Leaving global chat session {}", session_id),
        }
    }
    Ok(())
}
