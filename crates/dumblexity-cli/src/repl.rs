use crate::config::DumblexityConfig;
use dumblexity_agent::{
    extract_mermaid_blocks, GeminiBackend, GeminiModel, TurnConfig, TurnOrchestrator,
};
use dumblexity_builtins::register_builtins;
use dumblexity_citations::{CitationAggregator, HttpUrlResolver};
use dumblexity_core::{Capability, CapabilitySet, DumblexityError, DumblexityResult};
use dumblexity_session::{ChatSession, FileTranscriptStore, TranscriptStore};
use dumblexity_skills::SkillRegistry;
use futures_util::StreamExt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const HELP: &str = "\
Commands:
  /save NAME     save the conversation as NAME
  /load NAME     load a saved conversation
  /delete NAME   delete a saved conversation
  /sessions      list saved conversations
  /clear         start a new, unsaved conversation
  /diagrams      print Mermaid diagrams from the last answer
  /help          show this help
  /quit          exit
Anything else is sent to the model. Ctrl-C cancels a running answer.";

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Message(String),
    Save(String),
    Load(String),
    Delete(String),
    Sessions,
    Clear,
    Diagrams,
    Help,
    Quit,
    /// A command missing its argument, or not a command at all.
    Invalid(String),
    Empty,
}

pub fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplCommand::Message(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let with_name = |make: fn(String) -> ReplCommand| {
        if arg.is_empty() {
            ReplCommand::Invalid(format!("Usage: /{name} NAME"))
        } else {
            make(arg.to_string())
        }
    };

    match name {
        "save" => with_name(ReplCommand::Save),
        "load" => with_name(ReplCommand::Load),
        "delete" => with_name(ReplCommand::Delete),
        "sessions" => ReplCommand::Sessions,
        "clear" => ReplCommand::Clear,
        "diagrams" => ReplCommand::Diagrams,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("Unknown command: /{other} (try /help)")),
    }
}

/// Capability switches given on the command line.
#[derive(Debug, Default, clap::Args)]
pub struct CapabilityFlags {
    /// Enable provider web search grounding
    #[arg(long, overrides_with = "no_web_search")]
    web_search: bool,
    #[arg(long, hide = true)]
    no_web_search: bool,
    /// Enable provider maps grounding
    #[arg(long, overrides_with = "no_map_search")]
    map_search: bool,
    #[arg(long, hide = true)]
    no_map_search: bool,
    /// Enable the search_web tool
    #[arg(long, overrides_with = "no_external_web_search")]
    external_web_search: bool,
    #[arg(long, hide = true)]
    no_external_web_search: bool,
    /// Enable the page and video extraction tools
    #[arg(long, overrides_with = "no_extraction")]
    extraction: bool,
    #[arg(long, hide = true)]
    no_extraction: bool,
}

impl CapabilityFlags {
    pub fn apply(&self, mut set: CapabilitySet) -> CapabilitySet {
        let switches = [
            (Capability::WebSearch, self.web_search, self.no_web_search),
            (Capability::MapSearch, self.map_search, self.no_map_search),
            (
                Capability::ExternalWebSearch,
                self.external_web_search,
                self.no_external_web_search,
            ),
            (Capability::Extraction, self.extraction, self.no_extraction),
        ];
        for (capability, on, off) in switches {
            if on {
                set.set(capability, true);
            } else if off {
                set.set(capability, false);
            }
        }
        set
    }
}

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
    /// Load (or create) this saved session
    #[arg(short, long)]
    pub session: Option<String>,
    /// Model for this chat (overrides config)
    #[arg(short, long)]
    pub model: Option<GeminiModel>,
    #[command(flatten)]
    pub capabilities: CapabilityFlags,
}

pub async fn run(
    config: DumblexityConfig,
    store: FileTranscriptStore,
    args: ChatArgs,
) -> anyhow::Result<()> {
    if config.model.api_key.trim().is_empty() {
        anyhow::bail!("No Gemini API key: set GEMINI_API_KEY or [model].api_key");
    }

    let turn_config = TurnConfig {
        model: args.model.unwrap_or(config.model.model),
        capabilities: args.capabilities.apply(config.capabilities.to_set()),
        location: config.location,
    };
    if turn_config.capabilities.contains(Capability::MapSearch) && turn_config.location.is_none()
    {
        println!("Note: maps grounding is on but no [location] is configured.");
    }

    let mut registry = SkillRegistry::new();
    register_builtins(&mut registry, &config.tools.builtins());
    info!(count = registry.skill_count(), "Built-in skills registered");

    let resolver = HttpUrlResolver::new()
        .with_timeout(Duration::from_secs(config.tools.resolver_timeout_secs));
    let orchestrator = TurnOrchestrator::new(
        Arc::new(GeminiBackend::new(config.model.clone())),
        registry,
        Arc::new(CitationAggregator::new(Arc::new(resolver))),
    );

    let mut session = ChatSession::new();
    if let Some(name) = &args.session {
        open_session(&mut session, &store, name).await;
    }

    println!(
        "Dumblexity ({}; {}). Type /help for commands.",
        turn_config.model,
        describe(&turn_config.capabilities)
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&session);
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match parse_command(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Invalid(message) => println!("{message}"),
            ReplCommand::Message(input) => {
                match stream_turn(&orchestrator, &mut session, &input, &turn_config).await {
                    Ok(true) => {
                        session.autosave(&store).await;
                    }
                    Ok(false) => println!("\n[cancelled]"),
                    Err(e) => println!("\n[error] {e}"),
                }
            }
            ReplCommand::Save(name) => match session.save_as(&store, &name).await {
                Ok(saved) => println!("Session '{saved}' saved."),
                Err(e) => println!("Failed to save session: {e}"),
            },
            ReplCommand::Load(name) => match session.load(&store, &name).await {
                Ok(()) => {
                    println!("Session '{name}' loaded.");
                    print_transcript(&session);
                }
                Err(e) => println!("Failed to load session: {e}"),
            },
            ReplCommand::Delete(name) => match session.delete(&store, &name).await {
                Ok(()) => println!("Session '{name}' deleted."),
                Err(e) => println!("Failed to delete session: {e}"),
            },
            ReplCommand::Sessions => match store.list().await {
                Ok(names) if names.is_empty() => println!("No saved sessions."),
                Ok(names) => {
                    for name in names {
                        let marker = if session.name() == Some(name.as_str()) { "*" } else { " " };
                        println!("{marker} {name}");
                    }
                }
                Err(e) => println!("Failed to list sessions: {e}"),
            },
            ReplCommand::Clear => {
                session.clear();
                println!("Started a new conversation.");
            }
            ReplCommand::Diagrams => {
                let blocks = session
                    .transcript()
                    .last_assistant()
                    .map(|turn| extract_mermaid_blocks(&turn.content))
                    .unwrap_or_default();
                if blocks.is_empty() {
                    println!("No diagrams in the last answer.");
                }
                for (i, block) in blocks.iter().enumerate() {
                    println!("--- diagram {} ---\n{block}", i + 1);
                }
            }
        }
    }

    Ok(())
}

/// Streams one answer to stdout. `Ok(false)` means the user cancelled.
async fn stream_turn(
    orchestrator: &TurnOrchestrator,
    session: &mut ChatSession,
    input: &str,
    turn_config: &TurnConfig,
) -> DumblexityResult<bool> {
    let mut stream = orchestrator
        .run_turn(session.transcript(), input, turn_config)
        .await?;

    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(fragment)) => {
                    print!("{fragment}");
                    let _ = stdout.flush();
                }
                Some(Err(e)) => return Err(e),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => return Ok(false),
        }
    }

    let completed = stream.finalize().await?;
    println!("{}", completed.citation_text());
    let diagrams = completed.mermaid_blocks().len();
    if diagrams > 0 {
        println!("[{diagrams} diagram(s): /diagrams to print]");
    }
    session.record_exchange(completed.input(), completed.content());
    Ok(true)
}

async fn open_session(session: &mut ChatSession, store: &dyn TranscriptStore, name: &str) {
    match session.load(store, name).await {
        Ok(()) => {
            println!("Resumed session '{name}'.");
            print_transcript(session);
        }
        Err(DumblexityError::SessionNotFound(_)) => match session.save_as(store, name).await {
            Ok(saved) => println!("New session '{saved}'."),
            Err(e) => println!("Failed to create session: {e}"),
        },
        Err(e) => println!("Failed to load session: {e}"),
    }
}

fn print_transcript(session: &ChatSession) {
    for turn in session.transcript().turns() {
        println!("[{}]\n{}\n", turn.role.as_str(), turn.content);
    }
}

fn prompt(session: &ChatSession) {
    match session.name() {
        Some(name) => print!("{name}> "),
        None => print!("> "),
    }
    let _ = std::io::stdout().flush();
}

fn describe(capabilities: &CapabilitySet) -> String {
    let names: Vec<&str> = capabilities
        .iter()
        .map(|c| match c {
            Capability::WebSearch => "web search",
            Capability::MapSearch => "maps",
            Capability::ExternalWebSearch => "search tool",
            Capability::Extraction => "extraction",
        })
        .collect();
    if names.is_empty() {
        "no tools".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_messages_and_commands() {
        assert_eq!(parse_command("   "), ReplCommand::Empty);
        assert_eq!(
            parse_command("  What is Rust? "),
            ReplCommand::Message("What is Rust?".into())
        );
        assert_eq!(
            parse_command("/save My Session!!"),
            ReplCommand::Save("My Session!!".into())
        );
        assert_eq!(parse_command("/load trip"), ReplCommand::Load("trip".into()));
        assert_eq!(parse_command("/delete  trip "), ReplCommand::Delete("trip".into()));
        assert_eq!(parse_command("/sessions"), ReplCommand::Sessions);
        assert_eq!(parse_command("/clear"), ReplCommand::Clear);
        assert_eq!(parse_command("/diagrams"), ReplCommand::Diagrams);
        assert_eq!(parse_command("/help"), ReplCommand::Help);
        assert_eq!(parse_command("/quit"), ReplCommand::Quit);
        assert_eq!(parse_command("/exit"), ReplCommand::Quit);
    }

    #[test]
    fn test_parse_invalid_commands() {
        assert!(matches!(parse_command("/save"), ReplCommand::Invalid(m) if m.contains("/save NAME")));
        assert!(matches!(parse_command("/frobnicate"), ReplCommand::Invalid(m) if m.contains("Unknown")));
    }

    #[test]
    fn test_capability_flags_override_config() {
        let base = CapabilitySet::new()
            .with(Capability::WebSearch)
            .with(Capability::Extraction);
        let flags = CapabilityFlags {
            map_search: true,
            no_web_search: true,
            ..CapabilityFlags::default()
        };
        let set = flags.apply(base.clone());
        assert!(!set.contains(Capability::WebSearch));
        assert!(set.contains(Capability::MapSearch));
        assert!(set.contains(Capability::Extraction));
        assert!(!set.contains(Capability::ExternalWebSearch));

        assert_eq!(CapabilityFlags::default().apply(base.clone()), base);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&CapabilitySet::new()), "no tools");
        assert_eq!(
            describe(&CapabilitySet::new().with(Capability::Extraction)),
            "extraction"
        );
    }
}
