//! Scripted player input: one `click X Y` or `end` per line.
//!
//! Blank lines and lines starting with `//` are skipped.

use tactics_core::{Intent, TileCoord};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("script line {line}: cannot understand `{text}`")]
pub(crate) struct ScriptError {
    line: usize,
    text: String,
}

pub(crate) fn parse_line(line: usize, text: &str) -> Result<Option<Intent>, ScriptError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return Ok(None);
    }

    let error = || ScriptError {
        line,
        text: trimmed.to_owned(),
    };
    let mut words = trimmed.split_whitespace();
    let intent = match words.next() {
        Some("end") => Intent::EndTurn,
        Some("click") => {
            let mut coordinate = || {
                words
                    .next()
                    .and_then(|word| word.parse::<i32>().ok())
                    .ok_or_else(error)
            };
            let x = coordinate()?;
            let y = coordinate()?;
            Intent::Click {
                tile: TileCoord::new(x, y),
            }
        }
        _ => return Err(error()),
    };

    if words.next().is_some() {
        return Err(error());
    }
    Ok(Some(intent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clicks_and_turn_ends() {
        assert_eq!(
            parse_line(1, "click 3 -1"),
            Ok(Some(Intent::Click {
                tile: TileCoord::new(3, -1)
            }))
        );
        assert_eq!(parse_line(2, "  end  "), Ok(Some(Intent::EndTurn)));
        assert_eq!(parse_line(3, "// opening"), Ok(None));
        assert_eq!(parse_line(4, ""), Ok(None));
    }

    #[test]
    fn rejects_malformed_lines() {
        for text in ["click 3", "click a b", "end now", "jump"] {
            assert_eq!(
                parse_line(7, text),
                Err(ScriptError {
                    line: 7,
                    text: text.to_owned(),
                })
            );
        }
    }
}
