//! HCL string quoting and a structural sanity check for rendered files.

/// Quote a value as an HCL string literal.
///
/// Escapes quotes, backslashes and control characters, and neutralises
/// template sequences (`${`, `%{`) so the value is always taken literally.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');

    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out.push('"');
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Str,
    Interp(usize),
}

/// Check that braces, brackets and parentheses balance, and that every
/// string literal and interpolation is closed.
///
/// This is not a full HCL parser; it catches the malformed output a broken
/// template would produce.
pub fn check_structure(text: &str) -> Result<(), String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut mode = Mode::Code;
    let mut line = 1;
    let mut string_start = 0;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            if mode == Mode::Str {
                return Err(format!("unterminated string starting on line {}", string_start));
            }
            line += 1;
        }

        match mode {
            Mode::Code => match c {
                '#' => {
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                '"' => {
                    mode = Mode::Str;
                    string_start = line;
                }
                '{' | '[' | '(' => stack.push((c, line)),
                '}' | ']' | ')' => {
                    let expected = match c {
                        '}' => '{',
                        ']' => '[',
                        _ => '(',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        Some((open, open_line)) => {
                            return Err(format!(
                                "'{}' on line {} closes '{}' from line {}",
                                c, line, open, open_line
                            ))
                        }
                        None => return Err(format!("unmatched '{}' on line {}", c, line)),
                    }
                }
                _ => {}
            },
            Mode::Str => match c {
                '\\' => {
                    chars.next();
                }
                '"' => mode = Mode::Code,
                '$' | '%' if chars.peek() == Some(&c) => {
                    // `$${` and `%%{` are escaped literals.
                    chars.next();
                    if chars.peek() == Some(&'{') {
                        chars.next();
                    }
                }
                '$' | '%' if chars.peek() == Some(&'{') => {
                    chars.next();
                    mode = Mode::Interp(1);
                }
                _ => {}
            },
            Mode::Interp(depth) => match c {
                '{' => mode = Mode::Interp(depth + 1),
                '}' if depth == 1 => mode = Mode::Str,
                '}' => mode = Mode::Interp(depth - 1),
                _ => {}
            },
        }
    }

    match mode {
        Mode::Str | Mode::Interp(_) => {
            return Err(format!("unterminated string starting on line {}", string_start))
        }
        Mode::Code => {}
    }

    if let Some((open, open_line)) = stack.pop() {
        return Err(format!("'{}' on line {} is never closed", open, open_line));
    }

    Ok(())
}
