use clap::{Parser, Subcommand};
use inquire::{InquireError, Text};

use crate::clients::backend_client::{BackendClient, ChatTransport};
use crate::config::ShellSettings;
use crate::error::BookingError;
use crate::handlers::facade::{AvailabilityRequest, ChatRequest, CreateEventRequest};
use crate::models::chat::{ChatTurn, ConversationHistory};

pub const GREETING: &str = "How can I help you book an appointment today?";

#[derive(Parser)]
#[command(name = "tailorTalk", about = "Book appointments by chatting with the TailorTalk backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation (default).
    Chat,
    /// List busy slots in a time range.
    Availability {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Create an event directly, without the assistant.
    Book {
        #[arg(long)]
        summary: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Check that the backend is up.
    Health,
}

/// What a line typed at the prompt means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Quit,
    Clear,
    Skip,
    Message(String),
}

impl ShellInput {
    pub fn classify(line: &str) -> Self {
        match line.trim() {
            "" => ShellInput::Skip,
            "/quit" | "/exit" => ShellInput::Quit,
            "/clear" => ShellInput::Clear,
            other => ShellInput::Message(other.to_string()),
        }
    }
}

/// Client-held conversation. The backend never stores history, so every
/// turn re-sends all of it.
pub struct ChatSession<T: ChatTransport> {
    transport: T,
    history: ConversationHistory,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// A failed turn leaves the history untouched.
    pub async fn send(&mut self, message: &str) -> Result<String, BookingError> {
        let request = ChatRequest {
            user_message: message.to_string(),
            chat_history: self.history.clone(),
        };
        let reply = self.transport.chat(&request).await?.response;
        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::assistant(reply.clone()));
        Ok(reply)
    }
}

pub fn render_error(err: &BookingError) -> String {
    match err {
        BookingError::Remote { status, message } => format!("Error {status}: {message}"),
        other => format!("Error: {other}"),
    }
}

pub async fn cli(settings: ShellSettings) -> Result<(), BookingError> {
    // Fine to exit here on bad arguments
    let cli = Cli::parse();
    let client = BackendClient::new(&settings)?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => chat_loop(ChatSession::new(client)).await,
        Commands::Availability {
            start,
            end,
            timezone,
        } => {
            let request = AvailabilityRequest {
                start_time: start,
                end_time: end,
                timezone,
            };
            match client.check_availability(&request).await {
                Ok(response) if response.busy_slots.is_empty() => {
                    println!("The whole range is free.")
                }
                Ok(response) => {
                    println!("Busy:");
                    for slot in response.busy_slots {
                        println!("  {} -> {}", slot.start, slot.end);
                    }
                }
                Err(err) => println!("{}", render_error(&err)),
            }
        }
        Commands::Book {
            summary,
            start,
            end,
            description,
            location,
            timezone,
        } => {
            let request = CreateEventRequest {
                summary,
                start_time: start,
                end_time: end,
                description,
                location,
                timezone,
                attendees: None,
            };
            match client.create_event(&request).await {
                Ok(response) => {
                    println!("{} ({})", response.message, response.event_id);
                    println!("{}", response.html_link);
                }
                Err(err) => println!("{}", render_error(&err)),
            }
        }
        Commands::Health => match client.health().await {
            Ok(message) => println!("{message}"),
            Err(err) => println!("{}", render_error(&err)),
        },
    }
    Ok(())
}

async fn chat_loop<T: ChatTransport>(mut session: ChatSession<T>) {
    println!("assistant: {GREETING}");
    loop {
        let line = match Text::new("you:").prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => {
                println!("Input error: {e}");
                break;
            }
        };

        match ShellInput::classify(&line) {
            ShellInput::Quit => break,
            ShellInput::Skip => continue,
            ShellInput::Clear => {
                session.clear();
                println!("assistant: {GREETING}");
            }
            ShellInput::Message(message) => match session.send(&message).await {
                Ok(reply) => println!("assistant: {reply}"),
                Err(err) => println!("{}", render_error(&err)),
            },
        }
    }
}
