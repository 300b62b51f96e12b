use serde::{Deserialize, Serialize};
use std::fmt;

/// The sixteen colors a tile can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Gray,
    Silver,
    #[default]
    White,
    Maroon,
    Red,
    Olive,
    Yellow,
    Green,
    Lime,
    Teal,
    Aqua,
    Navy,
    Blue,
    Purple,
    Fuchsia,
}

impl Color {
    pub const ALL: [Color; 16] = [
        Color::Black,
        Color::Gray,
        Color::Silver,
        Color::White,
        Color::Maroon,
        Color::Red,
        Color::Olive,
        Color::Yellow,
        Color::Green,
        Color::Lime,
        Color::Teal,
        Color::Aqua,
        Color::Navy,
        Color::Blue,
        Color::Purple,
        Color::Fuchsia,
    ];

    /// Lowercase name, as used on the wire and in statistics.
    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::Gray => "gray",
            Color::Silver => "silver",
            Color::White => "white",
            Color::Maroon => "maroon",
            Color::Red => "red",
            Color::Olive => "olive",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Lime => "lime",
            Color::Teal => "teal",
            Color::Aqua => "aqua",
            Color::Navy => "navy",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Fuchsia => "fuchsia",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One cell's content. A new `Tile` is built for every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub row: i32,
    pub col: i32,
    pub color: Color,
    #[serde(default)]
    pub owner: String,
}

impl Tile {
    pub fn new(row: i32, col: i32, color: Color, owner: impl Into<String>) -> Self {
        Self {
            row,
            col,
            color,
            owner: owner.into(),
        }
    }

    /// Same position and color, attributed to `owner`.
    pub fn with_owner(self, owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..self
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}) {} by {}", self.row, self.col, self.color, self.owner)
    }
}

/// Square grid of tiles, one per cell.
///
/// Only the board service mutates it; everyone else sees clones sent in
/// `Board` notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    dimension: usize,
    tiles: Vec<Vec<Tile>>,
}

impl Board {
    /// Creates a `dimension` x `dimension` board of default-colored tiles.
    pub fn new(dimension: usize) -> Self {
        let tiles = (0..dimension)
            .map(|row| {
                (0..dimension)
                    .map(|col| Tile::new(row as i32, col as i32, Color::default(), ""))
                    .collect()
            })
            .collect();

        Self { dimension, tiles }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn get(&self, row: i32, col: i32) -> Option<&Tile> {
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        self.tiles.get(row)?.get(col)
    }

    /// A tile is valid when it targets a cell on the board.
    pub fn is_valid(&self, tile: &Tile) -> bool {
        self.get(tile.row, tile.col).is_some()
    }

    /// Replaces the cell addressed by `tile`. Out-of-bounds tiles are ignored;
    /// callers check [`Board::is_valid`] first.
    pub fn set(&mut self, tile: Tile) {
        let (Ok(row), Ok(col)) = (usize::try_from(tile.row), usize::try_from(tile.col)) else {
            return;
        };
        if let Some(cell) = self.tiles.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = tile;
        }
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().flatten()
    }
}
