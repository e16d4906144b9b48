//! Ask command handler.
//!
//! Answers one question from the current index.

use clap::Args;
use sage_core::{config::AppConfig, AppError, AppResult};
use sage_knowledge::{unique_sources, AskResponse, RagService};

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Vec<String>,

    /// Number of chunks to retrieve (default: generation.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let question = self.question.join(" ");
        let top_k = self.top_k.unwrap_or(config.generation.top_k);

        tracing::info!(top_k, "Executing ask command");

        let result = self.answer(config, &question, top_k).await;
        if self.json {
            let response = result.map_err(super::report_failure)?;
            super::print_json(&response)?;
        } else {
            print_answer(&result?);
        }

        Ok(())
    }

    async fn answer(
        &self,
        config: &AppConfig,
        question: &str,
        top_k: usize,
    ) -> AppResult<AskResponse> {
        if question.trim().is_empty() {
            return Err(AppError::Input("No question provided".to_string()));
        }

        config.validate()?;
        let service = RagService::open(config)?;
        service.ask(question, top_k).await
    }
}

/// Human-readable rendering: the answer, then each source once.
pub(crate) fn print_answer(response: &AskResponse) {
    println!("{}", response.answer.trim_end());

    let sources = unique_sources(&response.sources);
    if !sources.is_empty() {
        println!();
        println!("Retrieved from:");
        for source in sources {
            println!("- {}", source);
        }
    }
}
