use crate::error::{FvError, Result};
use crate::types::header::{
    ExtractionRule, HEADER_TERMINATOR, HeaderKey, HeaderValue, RawHeaderFields,
};
use crate::utils::decode_cp1252;
use log::{debug, warn};
use winnow::{
    Parser,
    ascii::{digit0, digit1},
    combinator::opt,
    error::ContextError,
};

/// Unsigned decimal literal: `\d+\.?\d*`.
fn unsigned_literal<'a>(input: &mut &'a str) -> std::result::Result<&'a str, ContextError> {
    (digit1, opt(('.', digit0))).take().parse_next(input)
}

/// Signed decimal literal: `-?\d+\.?\d*`.
fn signed_literal<'a>(input: &mut &'a str) -> std::result::Result<&'a str, ContextError> {
    (opt('-'), digit1, opt(('.', digit0)))
        .take()
        .parse_next(input)
}

fn integer_literal<'a>(input: &mut &'a str) -> std::result::Result<&'a str, ContextError> {
    digit1.parse_next(input)
}

/// Collects every non-overlapping match of `literal` in `line`, left to right.
fn scan_literals(
    line: &str,
    literal: for<'a> fn(&mut &'a str) -> std::result::Result<&'a str, ContextError>,
) -> Vec<f64> {
    let mut values = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        let mut attempt = rest;
        match literal(&mut attempt) {
            Ok(text) => {
                if let Ok(value) = text.parse::<f64>() {
                    values.push(value);
                }
                rest = attempt;
            }
            Err(_) => {
                let mut chars = rest.chars();
                chars.next();
                rest = chars.as_str();
            }
        }
    }
    values
}

/// Applies the extraction rule of `key` to a line that contains it.
fn extract_values(key: &HeaderKey, line: &str) -> Vec<HeaderValue> {
    match key.rule {
        ExtractionRule::QuotedText => {
            let mut segments = line.rsplit('"');
            segments.next();
            segments
                .next()
                .map(|s| vec![HeaderValue::Text(s.to_string())])
                .unwrap_or_default()
        }
        ExtractionRule::FinalInteger => scan_literals(line, integer_literal)
            .last()
            .map(|n| vec![HeaderValue::Number(*n)])
            .unwrap_or_default(),
        ExtractionRule::Numeric => {
            if key.text.contains('@') || line.contains('@') || line.contains("LSB") {
                scan_literals(line, signed_literal)
                    .last()
                    .map(|n| vec![HeaderValue::Number(*n)])
                    .unwrap_or_default()
            } else {
                scan_literals(line, unsigned_literal)
                    .into_iter()
                    .map(HeaderValue::Number)
                    .collect()
            }
        }
        ExtractionRule::ParenthesizedValue => line
            .split_once('(')
            .and_then(|(_, tail)| tail.split_once(')'))
            .and_then(|(inner, _)| scan_literals(inner, signed_literal).first().copied())
            .map(|n| vec![HeaderValue::Number(n)])
            .unwrap_or_default(),
    }
}

/// Parses the text header at the start of `input`.
///
/// Every line is tested against every key of `vocabulary` by literal
/// substring match, and matching lines append their values to that key in
/// header order. Parsing stops at the terminator line; reaching the end of
/// input without it is a format error.
pub fn parse_header(input: &[u8], vocabulary: &[HeaderKey]) -> Result<RawHeaderFields> {
    let mut fields = RawHeaderFields::with_vocabulary(vocabulary);

    for (line_number, raw_line) in input.split(|&b| b == b'\n').enumerate() {
        let line = decode_cp1252(raw_line);
        let line = line.trim_end_matches(['\r', '\n']);

        for key in vocabulary {
            if !line.contains(key.text) {
                continue;
            }
            let values = extract_values(key, line);
            if values.is_empty() {
                warn!(
                    "header line {} matches '{}' but yields no value: {:?}",
                    line_number + 1,
                    key.text,
                    line
                );
            }
            for value in values {
                fields.push(key.text, value);
            }
        }

        if line.contains(HEADER_TERMINATOR) {
            debug!("header terminator found at line {}", line_number + 1);
            return Ok(fields);
        }
    }

    Err(FvError::Format(format!(
        "header terminator '\\{HEADER_TERMINATOR}' not found before end of input"
    )))
}

/// Parses a header already available as text.
pub fn parse_header_text(text: &str, vocabulary: &[HeaderKey]) -> Result<RawHeaderFields> {
    parse_header(text.as_bytes(), vocabulary)
}
