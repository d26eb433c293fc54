//! Suggestion commands: a one-shot `suggest` and the interactive `run` loop.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::console::{ConsoleField, ConsoleOverlay};
use crate::generation::LlmGenerator;
use crate::models::{EntryType, NewEntry};
use crate::pipeline::{Collaborators, PipelineCoordinator, PipelineSettings};
use crate::search::open_store;
use crate::traits::SuggestionGenerator;

/// One line of input in the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Replace the field text and fire a trigger.
    Type(String),
    Trigger,
    Navigate(isize),
    Accept,
    Dismiss,
    SwitchApp(String),
    Quit,
    Empty,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(ConsoleCommand::Empty);
        }
        let Some(command) = trimmed.strip_prefix(':') else {
            return Ok(ConsoleCommand::Type(line.trim_end_matches(['\r', '\n']).to_string()));
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "t" | "trigger" => Ok(ConsoleCommand::Trigger),
            "up" | "k" => Ok(ConsoleCommand::Navigate(-1)),
            "down" | "j" => Ok(ConsoleCommand::Navigate(1)),
            "accept" | "tab" => Ok(ConsoleCommand::Accept),
            "dismiss" | "esc" => Ok(ConsoleCommand::Dismiss),
            "app" if !arg.is_empty() => Ok(ConsoleCommand::SwitchApp(arg.to_string())),
            "app" => Err("usage: :app NAME".to_string()),
            "q" | "quit" => Ok(ConsoleCommand::Quit),
            other => Err(format!(
                "unknown command ':{}' (try :up, :down, :accept, :dismiss, :trigger, :app NAME, :quit)",
                other
            )),
        }
    }
}

/// Generate suggestions once for `text` and print them.
pub async fn run_suggest(config: &Config, text: &str, app: &str) -> Result<()> {
    let store = open_store(config).await?;
    let context = store
        .sliced_context(app, config.context.window_chars)
        .await?;
    tracing::debug!(context_chars = context.chars().count(), "context sliced");

    let generator = LlmGenerator::new(config)?;
    let suggestions = generator
        .generate(text, &context, app)
        .await
        .context("Suggestion generation failed")?;

    if suggestions.is_empty() {
        println!("No suggestions.");
    }
    for s in &suggestions {
        println!("{}. {}", s.index + 1, s.text);
    }

    store.close().await;
    Ok(())
}

/// Drive the full pipeline from stdin until EOF or `:quit`.
pub async fn run_interactive(config: &Config, app: &str) -> Result<()> {
    let store = Arc::new(open_store(config).await?);
    tracing::info!(
        path = %config.db.path.display(),
        entries = store.entry_count().await?,
        "context store opened"
    );

    let pruned = store
        .prune(config.context.max_age_hours, config.context.max_entries)
        .await?;
    if pruned > 0 {
        tracing::info!(pruned, "pruned old context entries");
    }

    let field = Arc::new(ConsoleField::new(app));
    let generator = Arc::new(LlmGenerator::new(config)?);
    let (coordinator, handle) = PipelineCoordinator::spawn(
        Collaborators {
            focus: field.clone(),
            generator,
            injector: field.clone(),
            overlay: Arc::new(ConsoleOverlay::new()),
            store: store.clone(),
        },
        PipelineSettings::from_config(config),
    );

    println!(
        "Autocompleter running in '{}'. Provider: {} | Model: {}",
        app, config.llm.provider, config.llm.model
    );
    println!(
        "Trigger key: {} (here, each typed line fires it). :up/:down to select, :accept, :dismiss, :quit.",
        config.suggestions.hotkey
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(c) => c,
            Err(msg) => {
                eprintln!("{}", msg);
                continue;
            }
        };
        match command {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Quit => break,
            ConsoleCommand::Type(text) => {
                field.set_text(text.clone());
                let focus = field.snapshot();
                let entry = NewEntry::new(focus.app_name, text, EntryType::UserInput);
                if let Err(e) = store.add_entry(entry).await {
                    tracing::warn!(error = %e, "failed to record input");
                }
                coordinator.on_trigger();
            }
            ConsoleCommand::Trigger => {
                coordinator.on_trigger();
            }
            ConsoleCommand::Navigate(delta) => {
                if !coordinator.on_navigate(delta) {
                    println!("  (no suggestions showing)");
                }
            }
            ConsoleCommand::Accept => {
                if coordinator.accept().await.is_none() {
                    println!("  (no suggestions showing)");
                }
            }
            ConsoleCommand::Dismiss => {
                coordinator.on_dismiss();
            }
            ConsoleCommand::SwitchApp(name) => {
                field.set_app(name.clone());
                println!("  now typing in '{}'", name);
            }
        }
    }

    drop(coordinator);
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "pipeline task ended abnormally");
    }
    store.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_line() {
        assert_eq!(
            ConsoleCommand::parse("Hello there").unwrap(),
            ConsoleCommand::Type("Hello there".to_string())
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse(":up").unwrap(), ConsoleCommand::Navigate(-1));
        assert_eq!(ConsoleCommand::parse(":down").unwrap(), ConsoleCommand::Navigate(1));
        assert_eq!(ConsoleCommand::parse(" :accept ").unwrap(), ConsoleCommand::Accept);
        assert_eq!(ConsoleCommand::parse(":esc").unwrap(), ConsoleCommand::Dismiss);
        assert_eq!(ConsoleCommand::parse(":q").unwrap(), ConsoleCommand::Quit);
        assert_eq!(
            ConsoleCommand::parse(":app Google Chrome").unwrap(),
            ConsoleCommand::SwitchApp("Google Chrome".to_string())
        );
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), ConsoleCommand::Empty);
    }

    #[test]
    fn test_parse_rejects_unknown_and_incomplete() {
        assert!(ConsoleCommand::parse(":app").is_err());
        assert!(ConsoleCommand::parse(":frobnicate").is_err());
    }
}
