
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password};

use super::{API_KEY_ENV, Config, EmbeddingConfig, RepoConfig, RetrievalConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Docs RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Documentation Source").bold().yellow());
    eprintln!("The repository whose markdown files will be indexed.");
    eprintln!();

    configure_repository(&mut config.repository)?;

    eprintln!();
    eprintln!("{}", style("Embedding API").bold().yellow());
    eprintln!("An OpenAI-compatible endpoint used to embed documents and queries.");
    eprintln!();

    configure_embedding(&mut config.embedding)?;
    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    if config.embedding.resolve_api_key().is_ok() {
        eprintln!("{}", style("✓ Embedding API key available").green());
    } else {
        eprintln!(
            "{}",
            style(format!(
                "⚠ Warning: no API key configured and {} is not set",
                API_KEY_ENV
            ))
            .yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Repository:").bold().yellow());
    eprintln!("  Owner: {}", style(&config.repository.owner).cyan());
    eprintln!("  Name: {}", style(&config.repository.repo).cyan());
    eprintln!("  Branch: {}", style(&config.repository.branch).cyan());
    eprintln!("  Root Path: {}", style(&config.repository.root_path).cyan());

    eprintln!();
    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  API URL: {}", style(&config.embedding.base_url).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
    eprintln!(
        "  Max Input Characters: {}",
        style(config.embedding.max_input_chars).cyan()
    );
    match config.embedding.resolve_api_key() {
        Ok(_) => eprintln!("  API Key: {}", style("configured").green()),
        Err(e) => eprintln!("  API Key: {} ({})", style("missing").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Snapshot: {}",
        style(config.snapshot_path().display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load_default().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_repository(repository: &mut RepoConfig) -> Result<()> {
    let owner: String = Input::new()
        .with_prompt("Repository owner")
        .with_initial_text(repository.owner.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Owner cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let repo: String = Input::new()
        .with_prompt("Repository name")
        .with_initial_text(repository.repo.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Repository name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let branch: String = Input::new()
        .with_prompt("Branch")
        .default(repository.branch.clone())
        .interact_text()?;

    let root_path: String = Input::new()
        .with_prompt("Documentation directory within the repository")
        .default(repository.root_path.clone())
        .allow_empty(true)
        .interact_text()?;

    repository.set_owner(owner)?;
    repository.set_repo(repo)?;
    repository.set_branch(branch)?;
    repository.set_root_path(root_path);

    Ok(())
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Embedding API base URL")
        .default(embedding.base_url.clone())
        .validate_with(|input: &String| -> Result<(), String> {
            let mut candidate = EmbeddingConfig::default();
            candidate
                .set_base_url(input.clone())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Documents per embedding request")
        .default(embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_key: String = Password::new()
        .with_prompt(format!(
            "API key (leave empty to use {} at runtime)",
            API_KEY_ENV
        ))
        .allow_empty_password(true)
        .interact()?;

    embedding.set_base_url(base_url)?;
    embedding.set_model(model)?;
    embedding.set_batch_size(batch_size)?;
    if !api_key.trim().is_empty() {
        embedding.api_key = Some(api_key);
    }

    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Documents returned per query")
        .default(retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("At least one document must be returned")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    retrieval.set_top_k(top_k)?;

    Ok(())
}
