//! Grouped short flag expansion
//!
//! Option abbreviation is off in the derived parsers, which also turns off
//! splitting of combined short flags. Tokens are split here before parsing.

/// Split grouped short flags: `-abc` becomes `-a -b -c`.
///
/// Everything after a literal `--` is passed through unchanged.
pub fn expand_short_flags<S: AsRef<str>>(argv: &[S]) -> Vec<String> {
    let mut expanded = Vec::with_capacity(argv.len());
    let mut rest = argv.iter().map(AsRef::as_ref);

    for token in rest.by_ref() {
        if token == "--" {
            expanded.push(token.to_string());
            break;
        }
        if is_grouped(token) {
            expanded.extend(token.chars().skip(1).map(|c| format!("-{c}")));
        } else {
            expanded.push(token.to_string());
        }
    }

    expanded.extend(rest.map(str::to_string));
    expanded
}

fn is_grouped(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some('-')
        && !matches!(chars.next(), Some('-' | '=') | None)
        && token.chars().count() >= 3
        && token[1..].parse::<f64>().is_err()
}
