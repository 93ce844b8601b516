//! Chat command handler.
//!
//! Interactive conversation with one session; `/reset` starts over.

use crate::commands::print_answer;
use charter_core::{config::AppConfig, AppError, AppResult};
use clap::Args;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive conversation about the constitution
#[derive(Args, Debug)]
pub struct ChatCommand {}

enum Input<'a> {
    Quit,
    Reset,
    Help,
    Unknown(&'a str),
    Question(&'a str),
}

fn parse_input(line: &str) -> Option<Input<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line {
        "/quit" | "/exit" | "/q" => Input::Quit,
        "/reset" => Input::Reset,
        "/help" | "/?" => Input::Help,
        cmd if cmd.starts_with('/') => Input::Unknown(cmd),
        question => Input::Question(question),
    })
}

fn prompt() -> AppResult<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let pipeline = charter_knowledge::open_pipeline(config).await?;
        let session = pipeline.new_session()?;
        tracing::info!(session = %session.id(), "Chat session started");

        println!("Ask about the constitution. /reset starts over, /quit exits.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_input(&line) {
                None => continue,
                Some(Input::Quit) => break,
                Some(Input::Reset) => {
                    session.reset()?;
                    println!("Conversation cleared.");
                }
                Some(Input::Help) => {
                    println!("/reset  clear the conversation");
                    println!("/quit   exit");
                }
                Some(Input::Unknown(cmd)) => {
                    println!("Unknown command: {}. Type /help for available commands.", cmd);
                }
                Some(Input::Question(question)) => {
                    match pipeline.answer(question, &session).await {
                        Ok(record) => print_answer(&record),
                        Err(AppError::Cancelled) => {}
                        Err(e) => {
                            // The turn is not recorded; the user may ask again.
                            eprintln!("Error: {}", e);
                        }
                    }
                    println!();
                }
            }
        }

        Ok(())
    }
}
