//! # twenty48 CLI
//!
//! Console shell for the configurable 2048 engine: an interactive game with
//! saves and a leaderboard, and a headless mode that runs the greedy
//! computer player for benchmarking.

mod storage;

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;
use twenty48_core::{Direction, Session};

#[derive(Parser, Debug)]
#[command(name = "twenty48")]
#[command(author, version, about = "Play 2048 with a custom board size and goal")]
struct Args {
    /// Board edge length (at least 2)
    #[arg(long, default_value = "4")]
    size: usize,

    /// Winning tile: a power of 2, greater than 8, at most 16384
    #[arg(short, long, default_value = "2048")]
    goal: u32,

    /// Random seed for deterministic runs
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Run this many headless episodes with the greedy policy and exit
    #[arg(short, long)]
    episodes: Option<u32>,

    /// Maximum steps per headless episode (0 = unlimited)
    #[arg(short, long, default_value = "10000")]
    max_steps: u32,

    /// Show the board after each move in headless mode
    #[arg(long)]
    verbose: bool,

    /// Directory holding the saves/ and scores/ folders
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(episodes) = args.episodes {
        run_headless(&args, episodes)
    } else {
        run_menu(&args)
    }
}

// -----------------------------------------------------------------------------
// Main menu
// -----------------------------------------------------------------------------

fn run_menu(args: &Args) -> Result<()> {
    let mut session = Session::new(args.size, args.goal, args.seed)?;

    loop {
        let choice =
            prompt("Enter game (new game), comp (computer game), load, leaderboard or q (quit): ")?;
        match choice.to_lowercase().as_str() {
            "game" => {
                session = new_session(args)?;
                play_interactive(&mut session, args)?;
            }
            "comp" => {
                session = new_session(args)?;
                play_computer(&mut session, args)?;
            }
            "load" => {
                if let Err(err) = load_into(&mut session, args) {
                    println!("{err:#}");
                } else {
                    play_interactive(&mut session, args)?;
                }
            }
            "leaderboard" => print_leaderboard(args)?,
            "q" => break,
            "" => {}
            _ => println!("invalid input"),
        }
    }
    Ok(())
}

/// Build a fresh session, prompting for size and goal with the CLI arguments
/// as defaults. Re-prompts until the engine accepts both.
fn new_session(args: &Args) -> Result<Session> {
    loop {
        let size = match prompt_number(&format!("Board size [{}]: ", args.size), args.size)? {
            Some(size) => size,
            None => continue,
        };
        let goal = match prompt_number(&format!("Goal [{}]: ", args.goal), args.goal)? {
            Some(goal) => goal,
            None => continue,
        };
        match Session::new(size, goal, args.seed) {
            Ok(session) => return Ok(session),
            Err(err) => println!("{err}"),
        }
    }
}

fn load_into(session: &mut Session, args: &Args) -> Result<()> {
    let name = prompt("Enter save file name: ")?;
    let grid = storage::load_board(&args.data_dir, &name, args.seed)?;
    info!("loaded save '{name}'");
    session.replace_grid(grid);
    Ok(())
}

fn print_leaderboard(args: &Args) -> Result<()> {
    println!("top scores:");
    for entry in storage::leaderboard(&args.data_dir)? {
        println!("{} - scored {}", entry.name, entry.score);
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Interactive play
// -----------------------------------------------------------------------------

enum InputAction {
    Move(Direction),
    Restart,
    ComputerMove,
    AutoPlay,
    SaveBoard,
    SaveScore,
    Quit,
    None,
}

fn play_interactive(session: &mut Session, args: &Args) -> Result<()> {
    let _raw = RawModeGuard::new();
    let mut stdin = io::stdin();
    let mut buffer = [0u8; 3];

    draw(session);

    loop {
        let bytes_read = stdin.read(&mut buffer).unwrap_or(0);
        if bytes_read == 0 {
            continue;
        }

        match parse_input(&buffer[..bytes_read]) {
            InputAction::Move(direction) => {
                if !session.is_terminal() {
                    let result = session.apply_player_move(direction);
                    draw(session);
                    if result.terminal {
                        handle_game_over(session, args)?;
                    }
                }
            }
            InputAction::ComputerMove => {
                let result = session.apply_computer_move();
                draw(session);
                if result.terminal {
                    handle_game_over(session, args)?;
                }
            }
            InputAction::AutoPlay => {
                while !session.is_terminal() {
                    session.apply_computer_move();
                    draw(session);
                    thread::sleep(Duration::from_millis(200));
                }
                handle_game_over(session, args)?;
            }
            InputAction::SaveBoard => {
                cooked(|| {
                    let name = prompt("Enter save file name: ")?;
                    match storage::save_board(&args.data_dir, &name, session.grid()) {
                        Ok(()) => {
                            info!("saved board as '{name}'");
                            println!("file saved");
                        }
                        Err(err) => println!("{err:#}"),
                    }
                    Ok(())
                })?;
                draw(session);
            }
            InputAction::SaveScore => {
                cooked(|| offer_score_save(session, args))?;
                draw(session);
            }
            InputAction::Restart => {
                *session = Session::new(
                    session.grid().size(),
                    session.goal(),
                    args.seed,
                )?;
                draw(session);
            }
            InputAction::Quit => break,
            InputAction::None => {}
        }
    }

    Ok(())
}

/// Computer plays a fresh board to completion, then offers a score save.
fn play_computer(session: &mut Session, args: &Args) -> Result<()> {
    while !session.is_terminal() {
        session.apply_computer_move();
        draw(session);
        thread::sleep(Duration::from_millis(200));
    }
    println!("\n*** GAME OVER ***");
    println!("Final score: {}", session.score());
    println!("Max tile: {}", session.max_tile());
    offer_score_save(session, args)
}

/// Game-over flow inside an interactive game; play stays open so the
/// player can restart or quit from the same screen.
fn handle_game_over(session: &Session, args: &Args) -> Result<()> {
    println!("\n*** GAME OVER ***");
    println!("Final score: {}", session.score());
    println!("Max tile: {}", session.max_tile());
    cooked(|| offer_score_save(session, args))?;
    println!("Press r to restart or q to return to the menu");
    Ok(())
}

fn offer_score_save(session: &Session, args: &Args) -> Result<()> {
    loop {
        let answer = prompt("Do you want to save the score? y for yes, n for no: ")?;
        match answer.to_lowercase().as_str() {
            "y" => loop {
                let name = prompt("Enter score name: ")?;
                match storage::save_score(&args.data_dir, &name, session.score()) {
                    Ok(()) => {
                        info!("recorded score {} for '{name}'", session.score());
                        println!("score saved");
                        return Ok(());
                    }
                    Err(err) => println!("{err:#}"),
                }
            },
            "n" => return Ok(()),
            _ => println!("invalid input"),
        }
    }
}

fn draw(session: &Session) {
    let grid = session.grid();
    let n = grid.size();
    print!("\x1b[2J\x1b[H"); // clear screen
    println!("=== twenty48 ===");
    println!("Controls: WASD/arrows move | c computer move | o autoplay");
    println!("          v save board | x save score | r restart | q quit\n");
    println!("Score: {}  Goal: {}", session.score(), session.goal());

    let separator = format!("+{}", "------+".repeat(n));
    println!("{separator}");
    for row in 0..n {
        print!("|");
        for col in 0..n {
            let val = grid.cells()[row * n + col];
            if val == 0 {
                print!("      |");
            } else {
                print!("{val:^6}|");
            }
        }
        println!();
        println!("{separator}");
    }
    println!("Max tile: {}", session.max_tile());
    if session.goal_reached() {
        println!("goal reached!!");
    }
    let _ = io::stdout().flush();
}

fn parse_input(bytes: &[u8]) -> InputAction {
    match bytes {
        // Arrow keys (escape sequences)
        [27, 91, 65] => InputAction::Move(Direction::Up),
        [27, 91, 66] => InputAction::Move(Direction::Down),
        [27, 91, 67] => InputAction::Move(Direction::Right),
        [27, 91, 68] => InputAction::Move(Direction::Left),

        // WASD keys
        [b'w'] | [b'W'] => InputAction::Move(Direction::Up),
        [b's'] | [b'S'] => InputAction::Move(Direction::Down),
        [b'a'] | [b'A'] => InputAction::Move(Direction::Left),
        [b'd'] | [b'D'] => InputAction::Move(Direction::Right),

        // Commands
        [b'c'] | [b'C'] => InputAction::ComputerMove,
        [b'o'] | [b'O'] => InputAction::AutoPlay,
        [b'v'] | [b'V'] => InputAction::SaveBoard,
        [b'x'] | [b'X'] => InputAction::SaveScore,
        [b'r'] | [b'R'] => InputAction::Restart,
        [b'q'] | [b'Q'] | [3] | [27] => InputAction::Quit, // q, Ctrl+C, Esc

        _ => InputAction::None,
    }
}

// -----------------------------------------------------------------------------
// Headless simulation
// -----------------------------------------------------------------------------

fn run_headless(args: &Args, episodes: u32) -> Result<()> {
    if episodes == 0 {
        println!("nothing to run");
        return Ok(());
    }

    let mut total_score: u64 = 0;
    let mut max_tile_overall: u32 = 0;
    let mut scores: Vec<u64> = Vec::with_capacity(episodes as usize);
    let mut max_tiles: Vec<u32> = Vec::with_capacity(episodes as usize);

    for episode in 0..episodes {
        let episode_seed = args.seed.wrapping_add(u64::from(episode));
        let mut session = Session::new(args.size, args.goal, episode_seed)?;
        let mut steps = 0;

        while !session.is_terminal() && (args.max_steps == 0 || steps < args.max_steps) {
            let result = session.apply_computer_move();
            if !result.moved {
                break;
            }
            steps += 1;

            if args.verbose {
                println!("Episode {} Step {}", episode + 1, steps);
                draw(&session);
            }
        }

        let score = session.score();
        let max_tile = session.max_tile();
        scores.push(score);
        max_tiles.push(max_tile);
        total_score += score;
        max_tile_overall = max_tile_overall.max(max_tile);

        info!(
            "episode {}: score={} max_tile={} steps={}",
            episode + 1,
            score,
            max_tile,
            steps
        );
    }

    let avg_score = total_score as f64 / f64::from(episodes);
    scores.sort_unstable();
    let median_score = if episodes % 2 == 0 {
        (scores[(episodes / 2 - 1) as usize] + scores[(episodes / 2) as usize]) as f64 / 2.0
    } else {
        scores[(episodes / 2) as usize] as f64
    };

    let mut tile_counts = std::collections::BTreeMap::new();
    for tile in &max_tiles {
        *tile_counts.entry(*tile).or_insert(0u32) += 1;
    }

    // Parseable output, one key per line
    println!("=== Simulation Results ===");
    println!("episodes={episodes}");
    println!("size={}", args.size);
    println!("goal={}", args.goal);
    println!("seed={}", args.seed);
    println!("max_steps={}", args.max_steps);
    println!("avg_score={avg_score:.2}");
    println!("median_score={median_score:.2}");
    println!("min_score={}", scores.first().unwrap_or(&0));
    println!("max_score={}", scores.last().unwrap_or(&0));
    println!("max_tile_overall={max_tile_overall}");

    print!("tile_distribution=");
    for (i, (tile, count)) in tile_counts.iter().enumerate() {
        if i > 0 {
            print!(",");
        }
        print!("{tile}:{count}");
    }
    println!();
    Ok(())
}

// -----------------------------------------------------------------------------
// Terminal plumbing
// -----------------------------------------------------------------------------

/// Print a prompt and read one trimmed line from stdin.
fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Prompt for a number; empty input falls back to `default`, junk re-prompts.
fn prompt_number<T: std::str::FromStr + Copy>(message: &str, default: T) -> Result<Option<T>> {
    let line = prompt(message)?;
    if line.is_empty() {
        return Ok(Some(default));
    }
    match line.parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            println!("invalid number");
            Ok(None)
        }
    }
}

/// Run a prompt-driven block with the terminal back in cooked mode.
fn cooked<F: FnOnce() -> Result<()>>(f: F) -> Result<()> {
    disable_raw_mode();
    let outcome = f();
    enable_raw_mode();
    outcome
}

/// Puts the terminal in raw mode and restores cooked mode on drop, so the
/// terminal is never left raw when play exits through an error.
struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Self {
        enable_raw_mode();
        RawModeGuard
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        disable_raw_mode();
    }
}

// Platform-specific terminal raw mode handling
#[cfg(unix)]
fn enable_raw_mode() {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let fd = io::stdin().as_raw_fd();
        let mut termios: libc::termios = std::mem::zeroed();
        libc::tcgetattr(fd, &mut termios);
        termios.c_lflag &= !(libc::ICANON | libc::ECHO);
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;
        libc::tcsetattr(fd, libc::TCSANOW, &termios);
    }
}

#[cfg(unix)]
fn disable_raw_mode() {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let fd = io::stdin().as_raw_fd();
        let mut termios: libc::termios = std::mem::zeroed();
        libc::tcgetattr(fd, &mut termios);
        termios.c_lflag |= libc::ICANON | libc::ECHO;
        libc::tcsetattr(fd, libc::TCSANOW, &termios);
    }
}

#[cfg(not(unix))]
fn enable_raw_mode() {
    // On non-Unix systems interactive mode requires Enter after each key
}

#[cfg(not(unix))]
fn disable_raw_mode() {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_mode_guard_restores_on_error_path() {
        fn play_that_fails() -> Result<()> {
            let _raw = RawModeGuard::new();
            anyhow::bail!("prompt failed mid-game");
        }
        // the guard's drop runs before the error propagates, so the
        // terminal is back in cooked mode for the caller
        assert!(play_that_fails().is_err());
    }
}
