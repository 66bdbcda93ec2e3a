//! Text level format shared with the level editor.
//!
//! Non-blank lines, in order: width, height, a free-form label, `height` rows
//! of 1-based terrain digits, a separator, then `height` rows of placement
//! symbols (`p` player character, `e` enemy character, `#` obstacle).

use tactics_core::{CharacterStats, Faction, LevelLayout, Placement, TerrainIndex, TileCoord};
use thiserror::Error;

/// Reasons a level text may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum LevelParseError {
    #[error("level ends before the {section} (line {line})")]
    Truncated { section: &'static str, line: usize },
    #[error("line {line}: expected a grid dimension, found `{value}`")]
    InvalidDimension { line: usize, value: String },
    #[error("line {line}: row holds {actual} tiles but the grid is {expected} wide")]
    ShortRow {
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[error("line {line}, column {column}: `{symbol}` is not a terrain digit")]
    InvalidTerrain {
        line: usize,
        column: usize,
        symbol: char,
    },
}

/// Parses level text, giving every character the provided stat block.
pub(crate) fn parse(text: &str, stats: CharacterStats) -> Result<LevelLayout, LevelParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_end()))
        .filter(|(_, line)| !line.is_empty());
    let mut next = |section: &'static str| {
        lines.next().ok_or(LevelParseError::Truncated {
            section,
            line: text.lines().count(),
        })
    };

    let columns = dimension(next("width")?)?;
    let rows = dimension(next("height")?)?;
    let _label = next("label")?;
    let width = usize::try_from(columns).unwrap_or(usize::MAX);

    let mut terrain = Vec::new();
    for _ in 0..rows {
        let (line, row) = next("terrain rows")?;
        for (column, symbol) in tiles(line, row, width)? {
            let index = symbol
                .to_digit(10)
                .and_then(|digit| digit.checked_sub(1))
                .and_then(|digit| u8::try_from(digit).ok())
                .ok_or(LevelParseError::InvalidTerrain {
                    line,
                    column: column + 1,
                    symbol,
                })?;
            terrain.push(TerrainIndex::new(index));
        }
    }

    let _separator = next("separator")?;

    let mut placements = Vec::new();
    for y in 0..rows {
        let (line, row) = next("placement rows")?;
        for (x, symbol) in tiles(line, row, width)? {
            let tile = TileCoord::new(coordinate(x), i32::try_from(y).unwrap_or(i32::MAX));
            match symbol {
                'p' => placements.push(Placement::character(tile, Faction::Player, stats)),
                'e' => placements.push(Placement::character(tile, Faction::Enemy, stats)),
                '#' => placements.push(Placement::obstacle(tile)),
                _ => {}
            }
        }
    }

    let mut layout = LevelLayout::new(columns, rows, placements);
    layout.terrain = terrain;
    Ok(layout)
}

fn dimension((line, value): (usize, &str)) -> Result<u32, LevelParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| LevelParseError::InvalidDimension {
            line,
            value: value.to_owned(),
        })
}

fn tiles(
    line: usize,
    row: &str,
    width: usize,
) -> Result<impl Iterator<Item = (usize, char)> + '_, LevelParseError> {
    let actual = row.chars().count();
    if actual < width {
        return Err(LevelParseError::ShortRow {
            line,
            expected: width,
            actual,
        });
    }
    Ok(row.chars().take(width).enumerate())
}

fn coordinate(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
