#[derive(Clone, Copy)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BacktickQuoted,
    LineComment,
    BlockComment,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Collect the names of `$name` placeholders in a Cypher text, in order of
/// first appearance.
///
/// String literals, backtick-quoted identifiers and comments are skipped, so
/// an interpolated label containing `$` is never mistaken for a parameter.
pub(crate) fn placeholder_names(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut names: Vec<&str> = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::BacktickQuoted,
                b'/' if bytes.get(idx + 1) == Some(&b'/') => state = State::LineComment,
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment;
                    idx += 1;
                }
                b'$' if bytes.get(idx + 1).copied().is_some_and(is_ident_start) => {
                    let start = idx + 1;
                    let mut end = start;
                    while end < bytes.len() && is_ident_continue(bytes[end]) {
                        end += 1;
                    }
                    let name = &text[start..end];
                    if !names.contains(&name) {
                        names.push(name);
                    }
                    idx = end - 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\\' {
                    idx += 1;
                } else if b == b'\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuoted => {
                if b == b'\\' {
                    idx += 1;
                } else if b == b'"' {
                    state = State::Normal;
                }
            }
            State::BacktickQuoted => {
                if b == b'`' {
                    if bytes.get(idx + 1) == Some(&b'`') {
                        idx += 1; // escaped backtick
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    names
}
