//! Rules Lawyer CLI - ask rules questions from the terminal.
//!
//! Signs in once, keeps the token between runs, and sends each line typed at
//! the prompt to the question endpoint.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use ruleslawyer_core::{ApiError, Config, RulesLawyer};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Log file name in cache directory
const LOG_FILE: &str = "ruleslawyer.log";

/// Environment variables that pre-fill the login prompt
const USERNAME_ENV: &str = "RULESLAWYER_USERNAME";
const PASSWORD_ENV: &str = "RULESLAWYER_PASSWORD";

const HELP: &str = "Commands: :whoami, :logout, :quit";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a file so they never interleave with the prompt.
fn init_tracing(log_dir: PathBuf) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

enum Command {
    Interactive,
    Ask(String),
    Health,
    Logout,
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args.get(1).map(String::as_str) {
        None => Ok(Command::Interactive),
        Some("--health") => Ok(Command::Health),
        Some("--logout") => Ok(Command::Logout),
        Some("--ask") => {
            let question = args[2..].join(" ");
            if question.trim().is_empty() {
                anyhow::bail!("--ask needs a question");
            }
            Ok(Command::Ask(question))
        }
        Some(other) => anyhow::bail!("Unknown argument: {}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config ({}), using defaults", e);
            Config::default()
        }
    };

    let log_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("."));
    let guard = init_tracing(log_dir);
    info!("Rules Lawyer starting");

    let lawyer = RulesLawyer::from_config(&config)?;
    if let Err(e) = lawyer.initialize() {
        warn!(error = %e, "Failed to read stored token");
        eprintln!("Warning: could not read stored token: {}", e);
    }

    let result = match command {
        Command::Health => lawyer.health().await.map(|h| println!("{}", h.status)),
        Command::Logout => {
            lawyer.logout()?;
            println!("Signed out.");
            Ok(())
        }
        Command::Ask(question) => {
            if !lawyer.is_authenticated() && !login(&lawyer, &mut config).await? {
                return Ok(());
            }
            lawyer.ask(&question).await.map(|answer| println!("{}", answer))
        }
        Command::Interactive => {
            run_repl(&lawyer, &mut config).await?;
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        drop(guard);
        std::process::exit(1);
    }

    info!("Rules Lawyer shutting down");
    drop(guard);
    Ok(())
}

fn prompt(label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Prompt until the server accepts a username and password.
/// Returns false if stdin closed first.
async fn login(lawyer: &RulesLawyer, config: &mut Config) -> Result<bool> {
    let default_username = std::env::var(USERNAME_ENV)
        .ok()
        .or_else(|| config.last_username.clone());
    let mut env_password = std::env::var(PASSWORD_ENV).ok();

    loop {
        let username = match &default_username {
            Some(last) => match prompt(&format!("Username [{}]: ", last))? {
                None => return Ok(false),
                Some(input) if input.is_empty() => last.clone(),
                Some(input) => input,
            },
            None => match prompt("Username: ")? {
                None => return Ok(false),
                Some(input) => input,
            },
        };

        // The env password is tried once; after a failure always ask
        let password = match env_password.take() {
            Some(password) => password,
            None => rpassword::prompt_password("Password: ")?,
        };

        if username.is_empty() || password.is_empty() {
            println!("Username and password required");
            continue;
        }

        println!("Signing in...");
        match lawyer.login(&username, &password).await {
            Ok(()) => {
                config.last_username = Some(username);
                if let Err(e) = config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                println!("Signed in.\n");
                return Ok(true);
            }
            Err(e @ ApiError::LoginFailed(_)) => println!("{}", e),
            Err(e) => println!("Login failed: {}", e),
        }
    }
}

async fn run_repl(lawyer: &RulesLawyer, config: &mut Config) -> Result<()> {
    println!("Rules Lawyer. {}", HELP);

    loop {
        if !lawyer.is_authenticated() && !login(lawyer, config).await? {
            return Ok(());
        }

        let Some(line) = prompt("> ")? else {
            return Ok(());
        };

        match line.as_str() {
            "" => continue,
            ":quit" | ":q" => return Ok(()),
            ":help" => println!("{}", HELP),
            ":logout" => {
                lawyer.logout()?;
                println!("Signed out.");
            }
            ":whoami" => match lawyer.verify().await {
                Ok(v) => println!("{} (token valid: {})", v.username, v.valid),
                Err(e) => report(&e),
            },
            question => match lawyer.ask(question).await {
                Ok(answer) => println!("{}\n", answer),
                Err(e) => report(&e),
            },
        }
    }
}

fn report(err: &ApiError) {
    if err.requires_login() {
        println!("Session ended: {}. Please sign in again.", err);
    } else {
        println!("Error: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        assert!(matches!(parse_args(&args(&["ruleslawyer"])).unwrap(), Command::Interactive));
        assert!(matches!(parse_args(&args(&["ruleslawyer", "--health"])).unwrap(), Command::Health));
        assert!(matches!(parse_args(&args(&["ruleslawyer", "--logout"])).unwrap(), Command::Logout));
        match parse_args(&args(&["ruleslawyer", "--ask", "can", "I", "flank?"])).unwrap() {
            Command::Ask(q) => assert_eq!(q, "can I flank?"),
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(parse_args(&args(&["ruleslawyer", "--ask"])).is_err());
        assert!(parse_args(&args(&["ruleslawyer", "--nope"])).is_err());
    }
}
