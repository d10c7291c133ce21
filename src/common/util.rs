use std::borrow::Cow;

/// Splits a shell-style command line into words.
///
/// Single quotes are literal, double quotes allow backslash escapes, and an
/// unquoted backslash escapes the next character. This is the inverse of
/// [`join_command`].
pub fn parse_command(command: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current_part = String::new();
    let mut in_word = false;
    let mut chars = command.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_word = true;
                for quoted in chars.by_ref() {
                    if quoted == '\'' {
                        break;
                    }
                    current_part.push(quoted);
                }
            }
            '"' => {
                in_word = true;
                while let Some(quoted) = chars.next() {
                    match quoted {
                        '"' => break,
                        '\\' => match chars.next() {
                            Some(next_ch @ ('"' | '\\' | '$' | '`')) => current_part.push(next_ch),
                            Some(next_ch) => {
                                current_part.push('\\');
                                current_part.push(next_ch);
                            }
                            None => current_part.push('\\'),
                        },
                        _ => current_part.push(quoted),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(next_ch) = chars.next() {
                    current_part.push(next_ch);
                }
            }
            ' ' | '\t' | '\n' => {
                if in_word {
                    parts.push(std::mem::take(&mut current_part));
                    in_word = false;
                }
            }
            _ => {
                in_word = true;
                current_part.push(ch);
            }
        }
    }

    if in_word {
        parts.push(current_part);
    }

    parts
}

fn is_shell_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ',')
}

/// Quotes a single argument for `sh -c` (and for sway's own command parser).
///
/// Arguments made only of safe characters are returned unchanged.
pub fn quote_argument(arg: &str) -> Cow<'_, str> {
    if !arg.is_empty() && arg.chars().all(is_shell_safe) {
        return Cow::Borrowed(arg);
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('\'');
    for ch in arg.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    Cow::Owned(quoted)
}

pub fn join_command<S: AsRef<str>>(args: &[S]) -> String {
    args.iter().map(|a| quote_argument(a.as_ref())).collect::<Vec<_>>().join(" ")
}
