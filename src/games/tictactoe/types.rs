//! Core domain types for tic-tac-toe.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Player mark on the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Mark {
    /// Mark X (moves first).
    X,
    /// Mark O (moves second).
    O,
}

impl Mark {
    /// Returns the opposing mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// Empty cell.
    Empty,
    /// Cell taken by a mark.
    Taken(Mark),
}

/// 3x3 board, cells in row-major order (0-8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    squares: [Square; 9],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            squares: [Square::Empty; 9],
        }
    }

    /// Gets the square at the given position (0-8).
    pub fn get(&self, pos: usize) -> Option<Square> {
        self.squares.get(pos).copied()
    }

    /// Sets the square at the given position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of bounds.
    pub fn set(&mut self, pos: usize, square: Square) -> Result<(), &'static str> {
        if pos >= 9 {
            return Err("Position out of bounds");
        }
        self.squares[pos] = square;
        Ok(())
    }

    /// Checks if a cell is empty.
    pub fn is_empty(&self, pos: usize) -> bool {
        matches!(self.get(pos), Some(Square::Empty))
    }

    /// Checks if every cell is taken.
    pub fn is_full(&self) -> bool {
        self.squares.iter().all(|s| *s != Square::Empty)
    }

    /// Returns all squares as a slice.
    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }

    /// Positions of all empty cells.
    pub fn open_cells(&self) -> Vec<usize> {
        self.squares
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Square::Empty)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Number of cells already taken.
    pub fn move_count(&self) -> i32 {
        self.squares.iter().filter(|s| **s != Square::Empty).count() as i32
    }

    /// Formats the board as a human-readable grid.
    ///
    /// Empty cells show their 1-based position so a player can pick one.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let pos = row * 3 + col;
                let symbol = match self.squares[pos] {
                    Square::Empty => (pos + 1).to_string(),
                    Square::Taken(mark) => mark.to_string(),
                };
                result.push_str(&symbol);
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Decided result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Three in a row for a mark.
    Win(Mark),
    /// Full board, no line.
    Draw,
}

impl Verdict {
    /// Converts the verdict to the string stored in the database.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Verdict::Win(Mark::X) => "X",
            Verdict::Win(Mark::O) => "O",
            Verdict::Draw => "DRAW",
        }
    }

    /// Parses a verdict from the string stored in the database.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "X" => Some(Verdict::Win(Mark::X)),
            "O" => Some(Verdict::Win(Mark::O)),
            "DRAW" => Some(Verdict::Draw),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
