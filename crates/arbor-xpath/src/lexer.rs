//! Expression tokenizer.
//!
//! Abbreviations are expanded here, so the parser only ever sees the
//! unabbreviated syntax: `.` becomes `self :: node ( )`, `..` becomes
//! `parent :: node ( )`, `//` becomes `/ descendant-or-self :: node ( ) /`
//! and `@` becomes `attribute ::`.
use crate::error::XPathError;
use crate::value::is_xml_space;

const SELF_NODE: [&str; 5] = ["self", "::", "node", "(", ")"];
const PARENT_NODE: [&str; 5] = ["parent", "::", "node", "(", ")"];
const DESCENDANT_OR_SELF: [&str; 7] = ["/", "descendant-or-self", "::", "node", "(", ")", "/"];
const ATTRIBUTE: [&str; 2] = ["attribute", "::"];

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Splits `expr` into tokens.
pub fn tokenize(expr: &str) -> Result<Vec<String>, XPathError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens: Vec<String> = Vec::new();
    let mut parens = 0_i32;
    let mut brackets = 0_i32;
    let mut i = 0;

    let push_all = |tokens: &mut Vec<String>, words: &[&str]| tokens.extend(words.iter().map(ToString::to_string));
    let run = |from: usize, pred: fn(char) -> bool| {
        let mut end = from;
        while end < chars.len() && pred(chars[end]) {
            end += 1;
        }
        end
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '"' | '\'' => {
                let end = i + 1 + chars[i + 1..].iter().take_while(|&&ch| ch != c).count();
                if end >= chars.len() {
                    return Err(XPathError::syntax(format!("unterminated string literal at offset {i}")));
                }
                tokens.push(chars[i..=end].iter().collect());
                i = end + 1;
            }
            c if is_xml_space(c) => i += 1,
            '.' if next == Some('.') => {
                push_all(&mut tokens, &PARENT_NODE);
                i += 2;
            }
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => {
                let end = run(i + 1, |c| c.is_ascii_digit());
                tokens.push(chars[i..end].iter().collect());
                i = end;
            }
            '.' => {
                push_all(&mut tokens, &SELF_NODE);
                i += 1;
            }
            '/' if next == Some('/') => {
                push_all(&mut tokens, &DESCENDANT_OR_SELF);
                i += 2;
            }
            '@' => {
                push_all(&mut tokens, &ATTRIBUTE);
                i += 1;
            }
            ':' if next == Some(':') => {
                tokens.push("::".to_string());
                i += 2;
            }
            '!' | '<' | '>' if next == Some('=') => {
                tokens.push(format!("{c}="));
                i += 2;
            }
            '0'..='9' => {
                let mut end = run(i, |c| c.is_ascii_digit());
                if end < chars.len() && chars[end] == '.' && chars.get(end + 1) != Some(&'.') {
                    end = run(end + 1, |c| c.is_ascii_digit());
                }
                tokens.push(chars[i..end].iter().collect());
                i = end;
            }
            '$' => {
                if !next.is_some_and(is_name_start) {
                    return Err(XPathError::syntax(format!("expected variable name after '$' at offset {i}")));
                }
                let end = run(i + 1, is_name_char);
                tokens.push(chars[i..end].iter().collect());
                i = end;
            }
            '(' | ')' | '[' | ']' => {
                let depth = if matches!(c, '(' | ')') { &mut parens } else { &mut brackets };
                *depth += if matches!(c, '(' | '[') { 1 } else { -1 };
                if *depth < 0 {
                    return Err(XPathError::syntax(format!("unbalanced '{c}' at offset {i}")));
                }
                tokens.push(c.to_string());
                i += 1;
            }
            ',' | '*' | '|' | '+' | '-' | '=' | '<' | '>' | '/' | ':' => {
                tokens.push(c.to_string());
                i += 1;
            }
            c if is_name_start(c) => {
                let end = run(i, is_name_char);
                tokens.push(chars[i..end].iter().collect());
                i = end;
            }
            other => return Err(XPathError::syntax(format!("unexpected character '{other}' at offset {i}"))),
        }
    }

    if parens != 0 {
        return Err(XPathError::syntax("parenthesized expression is not closed"));
    }
    if brackets != 0 {
        return Err(XPathError::syntax("predicate is not closed"));
    }
    tracing::trace!(expression = expr, tokens = tokens.len(), "tokenized");
    Ok(tokens)
}
