use bon::Builder;
use std::borrow::Cow;

/// Represents a 2D coordinate using row (y) and column (x).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Builder)]
pub struct Coordinate {
    pub y: usize,
    pub x: usize,
}

impl Coordinate {
    /// Row-major position of `index` in a grid `columns` wide.
    pub fn from_linear(index: usize, columns: usize) -> Self {
        Self {
            y: index / columns,
            x: index % columns,
        }
    }

    pub fn to_linear(self, columns: usize) -> usize {
        self.y * columns + self.x
    }
}

/// `count` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        stop
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

// Windows-1252 assignments of 0x80..=0x9F; undefined slots map to the C1 control.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Decodes Windows-1252 text, the encoding of instrument headers.
pub fn decode_cp1252(bytes: &[u8]) -> Cow<'_, str> {
    if bytes.is_ascii() {
        // ASCII is valid UTF-8
        return String::from_utf8_lossy(bytes);
    }
    Cow::Owned(
        bytes
            .iter()
            .map(|&b| match b {
                0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
                _ => char::from(b),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_row_major() {
        let c = Coordinate::from_linear(130, 64);
        assert_eq!(c, Coordinate { y: 2, x: 2 });
        assert_eq!(c.to_linear(64), 130);
    }

    #[test]
    fn test_linspace_endpoints() {
        let xs = linspace(0.0, 3.0, 4);
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(linspace(0.0, 0.7, 128).last().copied(), Some(0.7));
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_decode_cp1252() {
        assert_eq!(decode_cp1252(b"5 \xb5m"), "5 \u{b5}m");
        assert_eq!(decode_cp1252(b"\x80"), "\u{20AC}");
        assert_eq!(decode_cp1252(b"plain"), "plain");
    }
}
