//! Triline - unified CLI
//!
//! Local terminal play, an online synchronization demo, and stat queries.

#![warn(missing_docs)]

mod cli;
mod config;
mod db;
mod games;
mod identity;
mod local;
mod online;
mod stats;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::{Duration, timeout};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, Opponent};
use config::AppConfig;
use db::StatRepository;
use games::tictactoe::{Mark, MoveSelector, Verdict};
use identity::Identity;
use local::{LocalMatch, LocalMode, LocalStatus};
use online::{ChannelHub, MatchStatus, MatchStore, MemoryStore, OnlineMatch, Role, create_match};
use stats::{OutcomeSink, StatRecorder};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Local {
            opponent,
            mark,
            user,
            config,
        } => run_local(opponent, mark, user, config).await,
        Command::Demo { config } => run_demo(config).await,
        Command::Stats { user, db_path } => run_stats(user, db_path),
    }
}

/// Loads the config file when given, defaults otherwise.
fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => Ok(AppConfig::from_file(path)?),
        None => Ok(AppConfig::default()),
    }
}

/// Reads one trimmed line from stdin.
fn read_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Applies pending notifications until the session has been quiet briefly.
async fn settle(session: &mut OnlineMatch) {
    while let Ok(Ok(_)) = timeout(Duration::from_millis(25), session.next()).await {}
}

/// Play a local game in the terminal.
async fn run_local(
    opponent: Opponent,
    mark: String,
    user: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config)?;
    let human_mark: Mark = mark
        .parse()
        .map_err(|_| anyhow::anyhow!("mark must be X or O, got '{mark}'"))?;
    let mode = match opponent {
        Opponent::Friend => LocalMode::Friend,
        Opponent::Machine => LocalMode::Machine,
    };

    let mut game = LocalMatch::new(mode, human_mark, &config);
    if mode == LocalMode::Machine {
        if let Some(user) = user {
            let repository = StatRepository::new(config.db_path().clone())?;
            repository.apply_migrations()?;
            let recorder: Arc<dyn OutcomeSink> = Arc::new(StatRecorder::new(repository));
            game = game.with_recorder(Identity::new(user.clone(), user), recorder);
        }
    }

    loop {
        println!("\n{}\n", game.board().display());

        if game.status() == LocalStatus::Finished {
            match game.winner() {
                Some(Verdict::Win(winner)) => println!("{winner} wins!"),
                Some(Verdict::Draw) => println!("Draw."),
                None => {}
            }
            print!("Play again? [y/N] ");
            std::io::stdout().flush()?;
            if read_line()?.eq_ignore_ascii_case("y") {
                game.reset();
                continue;
            }
            return Ok(());
        }

        if mode == LocalMode::Machine && game.turn() == game.machine_mark() {
            if let Some(index) = game.machine_turn().await {
                println!("Machine plays {}", index + 1);
            }
            continue;
        }

        print!("{} to move (1-9): ", game.turn());
        std::io::stdout().flush()?;
        match read_line()?.parse::<usize>() {
            Ok(cell) if (1..=9).contains(&cell) => {
                if !game.apply_move(cell - 1) {
                    println!("That cell is taken.");
                }
            }
            _ => println!("Enter a number from 1 to 9."),
        }
    }
}

/// Run two in-process clients through a full online match.
async fn run_demo(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let store: Arc<dyn MatchStore> = Arc::new(MemoryStore::new());
    let hub = ChannelHub::new();

    let record = create_match(store.as_ref()).await?;
    let match_id = record.id().clone();
    info!(match_id = %match_id, "Demo match created");

    let mut alice = OnlineMatch::attach(
        Arc::clone(&store),
        &hub,
        &match_id,
        Identity::new("demo-alice".to_string(), "Alice".to_string()),
        None,
    )
    .await?;
    let mut bob = OnlineMatch::attach(
        Arc::clone(&store),
        &hub,
        &match_id,
        Identity::new("demo-bob".to_string(), "Bob".to_string()),
        None,
    )
    .await?;

    println!("Match {match_id}: Alice is X, Bob is O\n");

    let selector = MoveSelector::new(*config.blunder_probability());
    let mut rng = StdRng::from_os_rng();

    loop {
        // Let both sides apply whatever notifications are pending.
        settle(&mut alice).await;
        settle(&mut bob).await;
        if *alice.mirror().status() != MatchStatus::Playing {
            break;
        }

        let turn = *alice.mirror().current_turn();
        let mover = if alice.role() == Role::Player(turn) {
            &mut alice
        } else {
            &mut bob
        };

        let Some(index) = selector.select(&mut rng, mover.mirror().board(), turn) else {
            break;
        };
        mover.play(index);
        println!("{} plays {}\n{}\n", turn, index + 1, mover.mirror().board().display());
    }

    match alice.mirror().winner() {
        Some(Verdict::Win(winner)) => println!("{winner} wins!"),
        Some(Verdict::Draw) => println!("Draw."),
        None => println!("Game did not finish."),
    }
    Ok(())
}

/// Show recorded aggregates and history for a participant.
fn run_stats(user: String, db_path: String) -> Result<()> {
    let repository = StatRepository::new(db_path)?;
    repository.apply_migrations()?;
    let recorder = StatRecorder::new(repository);

    match recorder.aggregate(&user)? {
        Some(profile) => {
            println!(
                "{}: {} games | X {}W/{}L | O {}W/{}L | {} draws",
                profile.display_name(),
                profile.total_games(),
                profile.x_wins(),
                profile.x_losses(),
                profile.o_wins(),
                profile.o_losses(),
                profile.draws(),
            );
        }
        None => {
            println!("No games recorded for {user}");
            return Ok(());
        }
    }

    for outcome in recorder.history(&user)? {
        println!(
            "{} | {} as {} vs {} in {} moves{}",
            outcome.played_at(),
            outcome.result(),
            outcome.my_role(),
            outcome.opponent_name(),
            outcome.moves_count(),
            if *outcome.is_abandoned() {
                " (abandoned)"
            } else {
                ""
            },
        );
    }
    Ok(())
}
