//! Chat command handler.
//!
//! Interactive loop over one loaded service. Type `exit` or `quit` to leave.

use super::ask::print_answer;
use clap::Args;
use sage_core::{config::AppConfig, AppError, AppResult};
use sage_knowledge::RagService;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive question loop
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Number of chunks to retrieve per question (default: generation.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate()?;
        let service = RagService::open(config)?;
        let top_k = self.top_k.unwrap_or(config.generation.top_k);

        tracing::info!(top_k, chunks = service.corpus().len(), "Starting chat");
        println!("Ask a question about {}. Type 'exit' to quit.", config.generation.domain);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("\nYou: ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();

            if is_exit(question) {
                break;
            }
            if question.is_empty() {
                continue;
            }

            match service.ask(question, top_k).await {
                Ok(response) => {
                    println!();
                    print_answer(&response);
                }
                // One failed question does not end the session
                Err(e @ (AppError::Backend(_) | AppError::Input(_))) => {
                    tracing::warn!(kind = e.kind().as_str(), "Question failed: {}", e);
                    eprintln!("{}", e);
                }
                Err(e) => return Err(e),
            }
        }

        println!("Goodbye.");
        Ok(())
    }
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
