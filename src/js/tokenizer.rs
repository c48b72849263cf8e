//! Top-level splitting of array literals

use crate::error::CipherError;
use crate::js::scanner::{find_closing_bracket, find_top_level_comma};
use crate::Result;

/// Split an array literal into its top-level elements.
///
/// The literal must start with `[`; a trailing `]` is optional. Function
/// literals are kept whole even though their parameter lists and bodies
/// contain commas and brackets. Elements are returned trimmed and borrowed
/// from `literal`.
pub fn split_top_level(literal: &str) -> Result<Vec<&str>> {
    let body = literal.strip_prefix('[').ok_or_else(|| {
        CipherError::MalformedInput(format!(
            "array literal must start with '[': {}",
            preview(literal)
        ))
    })?;
    let body = body.trim_end();
    let body = body.strip_suffix(']').unwrap_or(body);

    let mut tokens = Vec::new();
    let mut rest = body;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        if rest.starts_with("function") {
            let len = function_literal_len(rest)?;
            tokens.push(&rest[..len]);
            rest = rest[len..].trim_start();
            rest = rest.strip_prefix(',').unwrap_or(rest);
            continue;
        }

        match find_top_level_comma(rest) {
            Some(i) => {
                tokens.push(rest[..i].trim_end());
                rest = &rest[i + 1..];
            }
            None => {
                tokens.push(rest.trim_end());
                break;
            }
        }
    }

    Ok(tokens)
}

/// Byte length of the function literal at the start of `text`
fn function_literal_len(text: &str) -> Result<usize> {
    let params_end = text.find(')').ok_or_else(|| {
        CipherError::MalformedInput(format!(
            "function literal without parameter list: {}",
            preview(text)
        ))
    })?;
    let after_params = &text[params_end + 1..];
    let body_start = params_end + 1 + (after_params.len() - after_params.trim_start().len());
    let body = find_closing_bracket(text, body_start)?;
    Ok(body.end)
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(40) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
