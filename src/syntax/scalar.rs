//! Scalar resolution (YAML 1.2 core schema) and recovery of scalar extents
//! from the source text.

use super::ScalarValue;
use yaml_rust2::scanner::TScalarStyle;

/// Resolve an untagged plain scalar.
pub(crate) fn resolve_plain(text: &str) -> ScalarValue {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarValue::Null,
        "true" | "True" | "TRUE" => return ScalarValue::Bool(true),
        "false" | "False" | "FALSE" => return ScalarValue::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return ScalarValue::Float(f64::INFINITY);
        }
        "-.inf" | "-.Inf" | "-.INF" => return ScalarValue::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return ScalarValue::Float(f64::NAN),
        _ => {}
    }

    if let Some(value) = parse_int(text) {
        return ScalarValue::Int(value);
    }
    if let Some(value) = parse_float(text) {
        return ScalarValue::Float(value);
    }

    ScalarValue::String(text.to_string())
}

/// Resolve a scalar carrying one of the `!!` core tags. Unknown core tags
/// fall back to plain resolution.
pub(crate) fn resolve_core_tagged(suffix: &str, text: &str) -> ScalarValue {
    match suffix {
        "str" => ScalarValue::String(text.to_string()),
        "null" => ScalarValue::Null,
        "bool" => match resolve_plain(text) {
            value @ ScalarValue::Bool(_) => value,
            _ => ScalarValue::String(text.to_string()),
        },
        "int" => parse_int(text)
            .map(ScalarValue::Int)
            .unwrap_or_else(|| ScalarValue::String(text.to_string())),
        "float" => parse_int(text)
            .map(|i| ScalarValue::Float(i as f64))
            .or_else(|| parse_float(text).map(ScalarValue::Float))
            .unwrap_or_else(|| ScalarValue::String(text.to_string())),
        _ => resolve_plain(text),
    }
}

fn parse_int(text: &str) -> Option<i64> {
    if let Some(octal) = text.strip_prefix("0o") {
        return i64::from_str_radix(octal, 8).ok();
    }
    if let Some(hex) = text.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }

    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_float(text: &str) -> Option<f64> {
    let allowed = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    let mantissa = text.split(['e', 'E']).next().unwrap_or_default();
    if !allowed || !mantissa.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Byte offset just past the scalar that starts at `start`.
///
/// The parser only reports where a scalar begins, so the end is recovered
/// from the source according to the scalar's style.
pub(crate) fn scalar_end(source: &str, start: usize, style: TScalarStyle, value: &str) -> usize {
    let start = start.min(source.len());
    match style {
        TScalarStyle::SingleQuoted => single_quoted_end(source, start),
        TScalarStyle::DoubleQuoted => double_quoted_end(source, start),
        TScalarStyle::Literal | TScalarStyle::Folded => block_end(source, start),
        _ => plain_end(source, start, value),
    }
}

fn single_quoted_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut idx = start + 1;
    while idx < bytes.len() {
        if bytes[idx] == b'\'' {
            if bytes.get(idx + 1) == Some(&b'\'') {
                idx += 2;
                continue;
            }
            return idx + 1;
        }
        idx += 1;
    }
    source.len()
}

fn double_quoted_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut idx = start + 1;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 2,
            b'"' => return idx + 1,
            _ => idx += 1,
        }
    }
    source.len()
}

/// A block scalar runs from its `|`/`>` header through every following line
/// that is blank or indented deeper than the header line. Trailing blank
/// lines are not part of the range.
fn block_end(source: &str, start: usize) -> usize {
    let line_start = source[..start].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let header_indent = indentation(&source[line_start..]);
    let header_end = source[start..]
        .find('\n')
        .map(|idx| start + idx)
        .unwrap_or(source.len());

    let mut end = strip_trailing_comment(&source[start..header_end])
        .trim_end()
        .len()
        + start;
    let mut cursor = header_end;

    while cursor < source.len() {
        let next_line_start = cursor + 1;
        if next_line_start > source.len() {
            break;
        }
        let line_end = source[next_line_start..]
            .find('\n')
            .map(|idx| next_line_start + idx)
            .unwrap_or(source.len());
        let line = source[next_line_start..line_end].trim_end_matches('\r');

        if line.trim().is_empty() {
            cursor = line_end;
            continue;
        }
        if indentation(line) <= header_indent {
            break;
        }
        end = next_line_start + line.len();
        cursor = line_end;
    }

    end.max(start + 1).min(source.len())
}

fn plain_end(source: &str, start: usize, value: &str) -> usize {
    if value.is_empty() {
        return start;
    }
    if source[start..].starts_with(value) {
        return start + value.len();
    }

    // Multi-line plain scalars are folded by the parser, so walk the source
    // word by word.
    let mut cursor = start;
    for word in value.split([' ', '\n']).filter(|w| !w.is_empty()) {
        match source[cursor..].find(word) {
            Some(idx) => cursor += idx + word.len(),
            None => break,
        }
    }
    cursor.max(start)
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn strip_trailing_comment(header: &str) -> &str {
    header
        .find(" #")
        .map(|idx| &header[..idx])
        .unwrap_or(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_core_schema() {
        assert_eq!(resolve_plain(""), ScalarValue::Null);
        assert_eq!(resolve_plain("~"), ScalarValue::Null);
        assert_eq!(resolve_plain("False"), ScalarValue::Bool(false));
        assert_eq!(resolve_plain("TRUE"), ScalarValue::Bool(true));
        assert_eq!(resolve_plain("22"), ScalarValue::Int(22));
        assert_eq!(resolve_plain("-7"), ScalarValue::Int(-7));
        assert_eq!(resolve_plain("0x1F"), ScalarValue::Int(31));
        assert_eq!(resolve_plain("0o17"), ScalarValue::Int(15));
        assert_eq!(resolve_plain("1.5"), ScalarValue::Float(1.5));
        assert_eq!(resolve_plain("1e3"), ScalarValue::Float(1000.0));
        assert_eq!(resolve_plain(".inf"), ScalarValue::Float(f64::INFINITY));
    }

    #[test]
    fn test_yaml_11_literals_stay_strings() {
        assert_eq!(resolve_plain("yes"), ScalarValue::String("yes".into()));
        assert_eq!(resolve_plain("off"), ScalarValue::String("off".into()));
        assert_eq!(resolve_plain("1_000"), ScalarValue::String("1_000".into()));
        assert_eq!(resolve_plain("inf"), ScalarValue::String("inf".into()));
        assert_eq!(resolve_plain("e5"), ScalarValue::String("e5".into()));
    }

    #[test]
    fn test_resolve_core_tagged() {
        assert_eq!(
            resolve_core_tagged("str", "22"),
            ScalarValue::String("22".into())
        );
        assert_eq!(resolve_core_tagged("float", "3"), ScalarValue::Float(3.0));
        assert_eq!(resolve_core_tagged("int", "x"), ScalarValue::String("x".into()));
    }

    #[test]
    fn test_quoted_ends() {
        let source = r#"a: 'it''s' b: "say \"hi\"" c"#;
        let single = source.find('\'').unwrap();
        assert_eq!(
            &source[single..scalar_end(source, single, TScalarStyle::SingleQuoted, "it's")],
            "'it''s'"
        );
        let double = source.find('"').unwrap();
        assert_eq!(
            &source[double..scalar_end(source, double, TScalarStyle::DoubleQuoted, "")],
            r#""say \"hi\"""#
        );
    }

    #[test]
    fn test_plain_end_single_and_folded() {
        let source = "key: hello world # note\n";
        let start = source.find("hello").unwrap();
        assert_eq!(
            scalar_end(source, start, TScalarStyle::Plain, "hello world"),
            start + "hello world".len()
        );

        let folded = "key: first\n  second\nnext: 1\n";
        let start = folded.find("first").unwrap();
        let end = scalar_end(folded, start, TScalarStyle::Plain, "first second");
        assert_eq!(&folded[start..end], "first\n  second");
    }

    #[test]
    fn test_block_end() {
        let source = "run: |\n  echo a\n\n  echo b\n\nnext: 1\n";
        let start = source.find('|').unwrap();
        let end = scalar_end(source, start, TScalarStyle::Literal, "echo a\n\necho b\n");
        assert_eq!(&source[start..end], "|\n  echo a\n\n  echo b");
    }

    #[test]
    fn test_block_end_without_body() {
        let source = "run: >\nnext: 1\n";
        let start = source.find('>').unwrap();
        assert_eq!(scalar_end(source, start, TScalarStyle::Folded, ""), start + 1);
    }
}
