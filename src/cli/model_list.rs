//! `models` subcommand: print the models installed on the server.

use std::error::Error;

use crate::api::models::fetch_models;

/// Lines printed for `models`, marking the configured default.
pub fn format_model_list(models: &[String], default_model: Option<&str>) -> Vec<String> {
    if models.is_empty() {
        return vec!["No models installed. Pull one with `ollama pull <model>`.".to_string()];
    }

    let mut lines = vec![format!("Found {} models:", models.len()), String::new()];
    for model in models {
        if Some(model.as_str()) == default_model {
            lines.push(format!("  • {model} (default)"));
        } else {
            lines.push(format!("  • {model}"));
        }
    }
    lines
}

pub async fn list_models(base_url: &str, default_model: Option<&str>) -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::new();
    let models = fetch_models(&client, base_url).await?;

    println!("🤖 Available models at {base_url}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    for line in format_model_list(&models, default_model) {
        println!("{line}");
    }
    Ok(())
}
