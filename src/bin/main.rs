use financial_research_agent::{config::AppConfig, FinancialAgent, RunStatus};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let agent = FinancialAgent::from_config(&config).await?;

    info!(
        model = %config.agent_model,
        max_turns = agent.max_turns(),
        "Financial research agent ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nQuestion (q to quit): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();

        if question.eq_ignore_ascii_case("q") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        println!("\n{}", "-".repeat(30));
        match agent.run(question).await {
            Ok(run) => {
                if run.status == RunStatus::TurnLimitReached {
                    info!(turns = run.turns_used, "Run stopped at the turn limit");
                }
                println!("{}", run.answer);
            }
            Err(e) => println!("Error: {}", e),
        }
        println!("{}", "-".repeat(30));
    }

    Ok(())
}
