//! Prompts command handler.

use crate::commands::print_json;
use charter_core::{config::AppConfig, AppResult};
use clap::Args;

/// List built-in prompts and workspace overrides
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let builtins = charter_prompt::builtin_prompt_ids();
        let overrides = charter_prompt::list_prompts(&config.workspace)?;

        if self.json {
            let output = serde_json::json!({
                "builtin": builtins,
                "overrides": overrides,
            });
            return print_json(&output);
        }

        println!("Built-in prompts:");
        for id in &builtins {
            let marker = if overrides.iter().any(|o| o == id) {
                " (overridden)"
            } else {
                ""
            };
            println!("  {}{}", id, marker);
        }

        let extra: Vec<&String> = overrides
            .iter()
            .filter(|o| !builtins.contains(&o.as_str()))
            .collect();
        if !extra.is_empty() {
            println!("Other workspace prompts:");
            for id in extra {
                println!("  {}", id);
            }
        }

        Ok(())
    }
}
