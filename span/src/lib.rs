use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A pair of T and the location where it starts in the original source code
pub type Located<T> = (T, Location);

/// A range representing a location in the original source code
pub type Span = Range<usize>;

/// A point in the original source code
///
/// Line and column are one based, the column counts characters. Offset is the
/// zero based byte index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Location {
    pub const START: Location = Location {
        line: 1,
        column: 1,
        offset: 0,
    };

    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn located_pairs_value_and_location() {
        let located: Located<&str> = ("test", Location::new(2, 4, 10));

        assert_eq!(Location::new(2, 4, 10), located.1);
    }

    #[test]
    fn location_defaults_to_start_of_source() {
        assert_eq!(Location::new(1, 1, 0), Location::default());
    }

    #[test]
    fn location_displays_line_and_column() {
        assert_eq!("3:14", Location::new(3, 14, 40).to_string());
    }
}
