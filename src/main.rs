//! # Mazecrawl Main Entry Point
//!
//! Terminal front end: reads commands from stdin, drives a game session and prints the
//! board after every change.

use clap::Parser;
use log::info;
use mazecrawl::{
    EntityTag, GameConfig, GameEvent, GameResult, GameSession, GameSnapshot, InputHandler,
    MazeResult, PlayerInput, Position,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

/// Command line arguments for mazecrawl.
#[derive(Parser, Debug)]
#[command(name = "mazecrawl")]
#[command(about = "A procedurally generated maze crawler with roulette encounters")]
#[command(version)]
struct Args {
    /// Random seed for maze generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Maze side length in cells
    #[arg(long)]
    size: Option<usize>,

    /// JSON configuration file (generation settings and entity table)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Print snapshots as JSON instead of drawing the board
    #[arg(long)]
    json: bool,
}

const HELP: &str = "Move: w/a/s/d, arrows words or h/j/k/l (several keys per line work)\n\
                    Enter: stop / apply the roulette   r: new maze   q: quit";

#[tokio::main]
async fn main() -> MazeResult<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .init();

    info!("Starting mazecrawl v{}", mazecrawl::VERSION);
    let config = load_config(&args)?;
    let (session, handle) = GameSession::new(config)?;
    let session_task = tokio::spawn(session.run());

    let initial = handle.snapshot();
    print_snapshot(&initial, args.json)?;
    println!("{HELP}");

    let printer = tokio::spawn(print_updates(handle.snapshots, args.json));
    let narrator = tokio::spawn(print_events(handle.events));

    let input_handler = InputHandler::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    'input: while let Some(line) = lines.next_line().await? {
        for input in input_handler.parse_line(&line) {
            match input {
                PlayerInput::Quit => break 'input,
                PlayerInput::Help => println!("{HELP}"),
                other => {
                    if let Some(command) = input_handler.input_to_command(other) {
                        if handle.commands.send(command).await.is_err() {
                            break 'input;
                        }
                    }
                }
            }
        }
    }

    drop(handle.commands);
    let statistics = session_task
        .await
        .map_err(|e| mazecrawl::MazeError::InvalidState(format!("session task failed: {e}")))??;
    if let Err(e) = printer.await {
        log::error!("Snapshot printer failed: {e}");
    }
    if let Err(e) = narrator.await {
        log::error!("Event narrator failed: {e}");
    }

    println!(
        "Steps: {}  Encounters: {}  Creatures removed: {}  Mazes: {}",
        statistics.steps_taken,
        statistics.encounters_resolved,
        statistics.creatures_removed,
        statistics.mazes_generated
    );
    Ok(())
}

/// Builds the game configuration from the optional file and command line overrides.
fn load_config(args: &Args) -> MazeResult<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.generation.seed = seed;
    }
    if let Some(size) = args.size {
        config.generation.size = size;
    }
    config.validate()?;
    Ok(config)
}

/// Prints every published snapshot except intermediate roulette frames.
async fn print_updates(mut snapshots: watch::Receiver<GameSnapshot>, json: bool) {
    let mut was_spinning = false;
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        let first_spin_frame = snapshot.spinning && !was_spinning;
        was_spinning = snapshot.spinning;
        if snapshot.spinning && !first_spin_frame {
            continue;
        }
        if let Err(e) = print_snapshot(&snapshot, json) {
            log::error!("Failed to print snapshot: {e}");
        }
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<GameEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(message) = describe(&event) {
            println!("{message}");
        }
    }
}

fn describe(event: &GameEvent) -> Option<String> {
    let message = match event {
        GameEvent::EncounterStarted { tag, .. } => format!("You run into {}!", tag.display_name()),
        GameEvent::EncounterResolved { label, .. } => format!("The roulette lands on \"{label}\"."),
        GameEvent::HealthChanged { from, to } => format!("Health {from} -> {to}"),
        GameEvent::PlayerTeleported { to, .. } => format!("You are flung to {to}."),
        GameEvent::EntitySpawned { tag, position } => {
            format!("{} appears at {position}.", tag.display_name())
        }
        GameEvent::KeyTaken => "You pick up the exit key.".to_string(),
        GameEvent::ExitRevealed { turns } => format!("The exit glows for {turns} turns."),
        GameEvent::ExitLocked => "You hear the exit grind shut.".to_string(),
        GameEvent::MazeRegenerated { generation } => format!("A new maze forms (#{generation})."),
        GameEvent::ExitSealed => "The exit is sealed. Find the key.".to_string(),
        GameEvent::GameWon => "You escape the maze! Press r for another.".to_string(),
        GameEvent::GameLost => "You have fallen. Press r to try again.".to_string(),
        _ => return None,
    };
    Some(message)
}

fn print_snapshot(snapshot: &GameSnapshot, json: bool) -> MazeResult<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{}", render(snapshot));
    }
    Ok(())
}

fn entity_glyph(tag: EntityTag) -> char {
    match tag {
        EntityTag::Bones => 'B',
        EntityTag::Wolf => 'W',
        EntityTag::Maw => 'M',
        EntityTag::HpVial => '+',
        EntityTag::Key => 'k',
    }
}

/// Draws the board, the status line and any active roulette as text.
fn render(snapshot: &GameSnapshot) -> String {
    let size = snapshot.grid.size();
    let exit = snapshot.grid.exit();
    let mut out = String::new();

    for row in 0..size as i32 {
        for col in 0..size as i32 {
            let pos = Position::new(row, col);
            let glyph = if pos == snapshot.player {
                '@'
            } else if let Some(tag) = EntityTag::COLLISION_ORDER.into_iter().find(|tag| {
                snapshot
                    .entities
                    .get(tag)
                    .is_some_and(|positions| positions.contains(&pos))
            }) {
                entity_glyph(tag)
            } else if pos == exit {
                'E'
            } else if snapshot.grid.is_open(pos) {
                '.'
            } else {
                '#'
            };
            out.push(glyph);
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "HP {:>3}  Key: {}  Turn {}",
        snapshot.health,
        if snapshot.has_key { "yes" } else { "no" },
        snapshot.turn_number
    ));
    if snapshot.reveal_exit_turns > 0 {
        out.push_str(&format!("  Exit revealed ({})", snapshot.reveal_exit_turns));
    }
    if snapshot.exit_locked {
        out.push_str("  Exit locked");
    }
    match snapshot.result {
        GameResult::Won => out.push_str("  *** ESCAPED ***"),
        GameResult::Lost => out.push_str("  *** FALLEN ***"),
        GameResult::InProgress => {}
    }

    if let Some(encounter) = &snapshot.encounter {
        out.push_str(&format!("\n{}:", encounter.tag.display_name()));
        for (index, option) in encounter.options.iter().enumerate() {
            let marker = if snapshot.selected_index == Some(index) {
                '>'
            } else {
                ' '
            };
            out.push_str(&format!("\n {marker} {}", option.label));
        }
        out.push_str(if snapshot.spinning {
            "\n(spinning... Enter to stop)"
        } else {
            "\n(Enter to accept)"
        });
    }
    out
}
