use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use doctorbot::{settings::Args, ChatOrchestrator, Session, Settings};
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: [&str; 3] = ["quit", "exit", "bye"];
const PATIENT: &str = "You";
const DOCTOR: &str = "DoctorBot";

fn is_exit(input: &str) -> bool {
    EXIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}

#[tokio::main]
async fn main() -> Result<()> {
    doctorbot::init_tracing("warn");

    let args = Args::parse();
    let settings = Settings::from_file(&args.config)
        .with_context(|| format!("Problem while loading {}", args.config.display()))?;
    let chat = ChatOrchestrator::connect(&settings)
        .await
        .context("Problem while starting the chat pipeline")?;
    println!("Doctor chatbot ready (model '{}')", chat.model());

    let mut session = Session::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("\n{DOCTOR}: Hello! Please tell me how you're feeling today.");
    loop {
        print!("\n{PATIENT}: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if is_exit(input) {
            break;
        }

        match chat.turn(&mut session, input).await {
            Ok(reply) => {
                println!("\n{DOCTOR}: {}", reply.text);
                if reply.diagnosis_newly_suggested {
                    println!(
                        "\n{DOCTOR}: I've suggested a likely diagnosis. \
                         Continue chatting or type 'quit' to end."
                    );
                }
            }
            Err(e) => println!(
                "\n{DOCTOR}: Sorry, I can't reach my medical knowledge right now ({e})."
            ),
        }
    }
    println!("\n{DOCTOR}: Take care! Wishing you good health.");

    println!("\nConversation Summary");
    println!("{}", "=".repeat(60));
    print!("{}", session.transcript(PATIENT, DOCTOR));
    println!("{}", "=".repeat(60));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::is_exit;

    #[test]
    fn exit_words() {
        assert!(is_exit("quit"));
        assert!(is_exit("EXIT"));
        assert!(is_exit("Bye"));
        assert!(!is_exit("goodbye"));
        assert!(!is_exit("I want to quit smoking"));
    }
}
