//! C-style comment stripping.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentState {
    Code,
    Block,
    Line,
}

/// Removes `/* block */` and `// line` comments from `input`.
///
/// Single pass, characters are never reordered. A line comment ends before
/// its newline, which is kept. An unterminated block comment swallows the
/// rest of the input.
#[must_use]
pub fn strip_comments(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut state = CommentState::Code;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            CommentState::Code => {
                if c == '/' {
                    match chars.peek() {
                        Some('*') => {
                            chars.next();
                            state = CommentState::Block;
                            continue;
                        }
                        Some('/') => {
                            chars.next();
                            state = CommentState::Line;
                            continue;
                        }
                        _ => {}
                    }
                }
                output.push(c);
            }
            CommentState::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = CommentState::Code;
                }
            }
            CommentState::Line => {
                if c == '\n' {
                    output.push(c);
                    state = CommentState::Code;
                }
            }
        }
    }

    output
}
