//! TextGrid annotation parsing
//!
//! Reads Praat TextGrid files and exposes their interval tiers as ordered
//! [`Interval`] records for the batch driver. Both the long ("full text")
//! and short formats are handled by tokenizing the file into just its
//! quoted strings and numbers; everything else in a TextGrid (key names,
//! `item [1]:` headers, `<exists>` flags) is structural noise that the two
//! formats disagree on. Point tiers are skipped. UTF-16 files (which
//! Praat writes for non-ASCII labels) are decoded via their BOM.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{FricspecError, Result};

/// One labeled time span from an annotation tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    /// Tier label text (may be empty)
    pub label: String,
}

impl Interval {
    /// Temporal midpoint of the interval
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.start_time + self.end_time)
    }
}

/// Read the named interval tier from a TextGrid file
///
/// Returns the tier's intervals in file order, empty labels included.
///
/// # Errors
/// `Io` if the file cannot be read, `Parse` on malformed content,
/// `MissingTier` if no interval tier carries the requested name.
pub fn read_intervals<P: AsRef<Path>>(path: P, tier: &str) -> Result<Vec<Interval>> {
    let bytes = std::fs::read(path)?;
    let content = decode_text(&bytes)?;
    parse_intervals(&content, tier)
}

/// Parse the named interval tier out of TextGrid content
pub fn parse_intervals(content: &str, tier: &str) -> Result<Vec<Interval>> {
    let mut tokens = Tokenizer::new(content);

    let file_type = tokens.expect_string("file type")?;
    if file_type != "ooTextFile" {
        return Err(FricspecError::Parse(format!(
            "unsupported file type {:?}",
            file_type
        )));
    }
    let object_class = tokens.expect_string("object class")?;
    if object_class != "TextGrid" {
        return Err(FricspecError::Parse(format!(
            "expected a TextGrid, found object class {:?}",
            object_class
        )));
    }

    tokens.expect_number("grid start time")?;
    tokens.expect_number("grid end time")?;
    let n_tiers = tokens.expect_count("tier count")?;

    for _ in 0..n_tiers {
        let class = tokens.expect_string("tier class")?;
        let name = tokens.expect_string("tier name")?;
        tokens.expect_number("tier start time")?;
        tokens.expect_number("tier end time")?;
        let count = tokens.expect_count("tier item count")?;

        match class.as_str() {
            "IntervalTier" => {
                let mut intervals = Vec::with_capacity(count);
                for _ in 0..count {
                    let start_time = tokens.expect_number("interval start")?;
                    let end_time = tokens.expect_number("interval end")?;
                    let label = tokens.expect_string("interval text")?;
                    intervals.push(Interval {
                        start_time,
                        end_time,
                        label,
                    });
                }
                if name == tier {
                    return Ok(intervals);
                }
            }
            "TextTier" => {
                // Point tier: time + mark per item, never a match
                for _ in 0..count {
                    tokens.expect_number("point time")?;
                    tokens.expect_string("point mark")?;
                }
            }
            other => {
                return Err(FricspecError::Parse(format!(
                    "unknown tier class {:?}",
                    other
                )));
            }
        }
    }

    Err(FricspecError::MissingTier(tier.to_string()))
}

/// Decode raw TextGrid bytes, honoring a UTF-16 BOM when present
fn decode_text(bytes: &[u8]) -> Result<String> {
    let decode_utf16 = |units: Box<dyn Iterator<Item = u16>>| -> Result<String> {
        char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|e| FricspecError::Parse(format!("invalid UTF-16: {}", e)))
    };

    match bytes {
        [0xFE, 0xFF, rest @ ..] => decode_utf16(Box::new(
            rest.chunks_exact(2).map(|p| u16::from_be_bytes([p[0], p[1]])),
        )),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(Box::new(
            rest.chunks_exact(2).map(|p| u16::from_le_bytes([p[0], p[1]])),
        )),
        _ => String::from_utf8(bytes.to_vec())
            .map_err(|e| FricspecError::Parse(format!("invalid UTF-8: {}", e))),
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Text(String),
    Number(f64),
}

/// Pulls quoted strings and bare numbers out of TextGrid content
struct Tokenizer {
    tokens: std::vec::IntoIter<Token>,
}

impl Tokenizer {
    fn new(content: &str) -> Self {
        let mut tokens = Vec::new();
        let mut chars = content.chars().peekable();

        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if c == '"' {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            // A doubled quote is an escaped quote
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                text.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(ch) => text.push(ch),
                        None => break,
                    }
                }
                tokens.push(Token::Text(text));
            } else if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                if let Ok(value) = word.parse::<f64>() {
                    tokens.push(Token::Number(value));
                }
                // Non-numeric words starting with a sign are noise
            } else {
                // Key names, brackets, flags: skip to the next whitespace
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() {
                        break;
                    }
                    chars.next();
                }
            }
        }

        Self {
            tokens: tokens.into_iter(),
        }
    }

    fn expect_string(&mut self, what: &str) -> Result<String> {
        match self.tokens.next() {
            Some(Token::Text(s)) => Ok(s),
            other => Err(FricspecError::Parse(format!(
                "expected {} string, found {:?}",
                what, other
            ))),
        }
    }

    fn expect_number(&mut self, what: &str) -> Result<f64> {
        match self.tokens.next() {
            Some(Token::Number(n)) => Ok(n),
            other => Err(FricspecError::Parse(format!(
                "expected {} number, found {:?}",
                what, other
            ))),
        }
    }

    fn expect_count(&mut self, what: &str) -> Result<usize> {
        let n = self.expect_number(what)?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(FricspecError::Parse(format!(
                "expected non-negative integer for {}, found {}",
                what, n
            )));
        }
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_FORMAT: &str = r#"File type = "ooTextFile"
Object class = "TextGrid"

xmin = 0
xmax = 1.5
tiers? <exists>
size = 2
item []:
    item [1]:
        class = "TextTier"
        name = "events"
        xmin = 0
        xmax = 1.5
        points: size = 1
        points [1]:
            number = 0.7
            mark = "burst"
    item [2]:
        class = "IntervalTier"
        name = "phones"
        xmin = 0
        xmax = 1.5
        intervals: size = 3
        intervals [1]:
            xmin = 0
            xmax = 0.4
            text = "s"
        intervals [2]:
            xmin = 0.4
            xmax = 0.9
            text = "a"
        intervals [3]:
            xmin = 0.9
            xmax = 1.5
            text = ""
"#;

    const SHORT_FORMAT: &str = r#"File type = "ooTextFile"
Object class = "TextGrid"

0
1.5
<exists>
1
"IntervalTier"
"phones"
0
1.5
2
0
0.8
"sh"
0.8
1.5
"i"
"#;

    #[test]
    fn test_long_format() {
        let intervals = parse_intervals(LONG_FORMAT, "phones").unwrap();
        assert_eq!(intervals.len(), 3);
        assert_eq!(intervals[0].label, "s");
        assert_eq!(intervals[0].start_time, 0.0);
        assert_eq!(intervals[0].end_time, 0.4);
        assert_eq!(intervals[1].label, "a");
        assert_eq!(intervals[2].label, "");
    }

    #[test]
    fn test_short_format() {
        let intervals = parse_intervals(SHORT_FORMAT, "phones").unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].label, "sh");
        assert_eq!(intervals[1].label, "i");
        assert_eq!(intervals[1].end_time, 1.5);
    }

    #[test]
    fn test_missing_tier() {
        assert!(matches!(
            parse_intervals(LONG_FORMAT, "words"),
            Err(FricspecError::MissingTier(_))
        ));
        // A point tier never satisfies an interval-tier lookup
        assert!(matches!(
            parse_intervals(LONG_FORMAT, "events"),
            Err(FricspecError::MissingTier(_))
        ));
    }

    #[test]
    fn test_escaped_quotes_in_labels() {
        let content = SHORT_FORMAT.replace("\"sh\"", "\"say \"\"sh\"\"\"");
        let intervals = parse_intervals(&content, "phones").unwrap();
        assert_eq!(intervals[0].label, "say \"sh\"");
    }

    #[test]
    fn test_not_a_textgrid() {
        let content = LONG_FORMAT.replace("TextGrid", "Pitch");
        assert!(matches!(
            parse_intervals(&content, "phones"),
            Err(FricspecError::Parse(_))
        ));
    }

    #[test]
    fn test_midpoint() {
        let interval = Interval {
            start_time: 1.0,
            end_time: 2.0,
            label: "f".to_string(),
        };
        assert_eq!(interval.midpoint(), 1.5);
    }
}
