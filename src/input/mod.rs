//! # Input Module
//!
//! Device-neutral input handling. Terminal lines, key names or any other source are
//! reduced to [`PlayerInput`] and then mapped onto the controller's [`Command`]s.

use crate::{Command, Direction};

/// Input handler for processing player commands.
///
/// Converts text input into player inputs, and player inputs into commands the
/// controller understands.
#[derive(Debug, Clone)]
pub struct InputHandler {
    /// Whether to enable Vi-style movement keys (hjkl)
    pub vi_keys_enabled: bool,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHandler {
    /// Creates a new input handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use mazecrawl::{InputHandler, PlayerInput};
    ///
    /// let input_handler = InputHandler::new();
    /// assert_eq!(input_handler.parse_token("q"), Some(PlayerInput::Quit));
    /// ```
    pub fn new() -> Self {
        Self {
            vi_keys_enabled: true,
        }
    }

    /// Parses a single key or word. Case-insensitive; unknown tokens yield `None`.
    pub fn parse_token(&self, token: &str) -> Option<PlayerInput> {
        let token = token.trim().to_ascii_lowercase();
        let input = match token.as_str() {
            "w" | "up" | "north" => PlayerInput::Move(Direction::Up),
            "s" | "down" | "south" => PlayerInput::Move(Direction::Down),
            "a" | "left" | "west" => PlayerInput::Move(Direction::Left),
            "d" | "right" | "east" => PlayerInput::Move(Direction::Right),
            "k" if self.vi_keys_enabled => PlayerInput::Move(Direction::Up),
            "j" if self.vi_keys_enabled => PlayerInput::Move(Direction::Down),
            "h" if self.vi_keys_enabled => PlayerInput::Move(Direction::Left),
            "l" if self.vi_keys_enabled => PlayerInput::Move(Direction::Right),
            "" | "space" | "enter" | "e" | "confirm" => PlayerInput::Confirm,
            "r" | "n" | "new" | "regenerate" => PlayerInput::NewGame,
            "?" | "help" => PlayerInput::Help,
            "q" | "quit" | "exit" | "esc" => PlayerInput::Quit,
            _ => return None,
        };
        Some(input)
    }

    /// Parses a whole line.
    ///
    /// An empty line confirms. A line of single-letter keys such as `ddds` expands to
    /// one input per key; anything else is treated as one token.
    pub fn parse_line(&self, line: &str) -> Vec<PlayerInput> {
        let line = line.trim();
        if line.is_empty() {
            return vec![PlayerInput::Confirm];
        }

        line.split_whitespace()
            .flat_map(|word| match self.parse_token(word) {
                Some(input) => vec![input],
                None => word
                    .chars()
                    .map(|key| self.parse_token(&key.to_string()))
                    .collect::<Option<Vec<_>>>()
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Maps a player input onto a controller command.
    ///
    /// Help and Quit are handled by the front end and have no command.
    pub fn input_to_command(&self, input: PlayerInput) -> Option<Command> {
        match input {
            PlayerInput::Move(direction) => Some(Command::Move(direction)),
            PlayerInput::Confirm => Some(Command::Confirm),
            PlayerInput::NewGame => Some(Command::Regenerate),
            PlayerInput::Help | PlayerInput::Quit => None,
        }
    }
}

/// Player input types that can be processed by the input handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// Move one cell
    Move(Direction),
    /// Stop or apply the roulette
    Confirm,
    /// Start a new maze
    NewGame,
    /// Show help information
    Help,
    /// Quit the game
    Quit,
}
