//! Template rendering for prompt content.
//!
//! Templates are rendered with Handlebars in non-strict mode: a variable that
//! is missing from the mapping renders as an empty string. Besides native
//! Handlebars syntax, a dot-prefixed dialect is accepted and translated
//! before rendering:
//!
//! | dialect              | handlebars            |
//! |----------------------|-----------------------|
//! | `{{.name}}`          | `{{name}}`            |
//! | `{{.user.name}}`     | `{{user.name}}`       |
//! | `{{.}}`              | `{{this}}`            |
//! | `{{$.name}}`         | `{{@root.name}}`      |
//! | `{{if .x}}`          | `{{#if x}}`           |
//! | `{{range .items}}`   | `{{#each items}}`     |
//! | `{{with .x}}`        | `{{#with x}}`         |
//! | `{{else}}`           | `{{else}}`            |
//! | `{{end}}`            | closes the open block |
//! | `{{- x -}}`          | `{{~ x ~}}`           |
//! | `{{/* note */}}`     | removed               |
//!
//! Rendering is pure: it touches neither the network nor the store, and the
//! same template with the same variables always yields the same text.

use crate::vars::Variables;
use handlebars::Handlebars;
use promptvault_core::{AppError, AppResult};

const TEMPLATE_NAME: &str = "prompt";

/// Render a prompt template against a variable mapping.
///
/// # Errors
/// Returns `AppError::Render` for unbalanced blocks, invalid field paths, or
/// any Handlebars parse/evaluation error. Nothing is returned on failure, so
/// a partially rendered prompt can never reach a provider.
///
/// # Example
/// ```
/// use promptvault_prompt::{parse_vars, render};
///
/// let vars = parse_vars("name=World").unwrap();
/// assert_eq!(render("Hello {{.name}}", &vars).unwrap(), "Hello World");
/// ```
pub fn render(template: &str, vars: &Variables) -> AppResult<String> {
    let translated = translate(template)?;
    if translated != template {
        tracing::trace!("Translated template: {}", translated);
    }

    let mut handlebars = Handlebars::new();

    // Prompts are plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string(TEMPLATE_NAME, &translated)
        .map_err(|e| AppError::Render(format!("Invalid template: {}", e)))?;

    handlebars
        .render(TEMPLATE_NAME, vars)
        .map_err(|e| AppError::Render(format!("Failed to render template: {}", e)))
}

/// Block directives of the dot-prefixed dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    If,
    Range,
    With,
}

impl Block {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "if" => Some(Self::If),
            "range" => Some(Self::Range),
            "with" => Some(Self::With),
            _ => None,
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Range => "range",
            Self::With => "with",
        }
    }

    fn helper(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Range => "each",
            Self::With => "with",
        }
    }
}

/// Rewrite dialect actions into Handlebars, leaving native syntax untouched.
fn translate(template: &str) -> AppResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut open_blocks: Vec<Block> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        // Triple-stash is native Handlebars
        if tail.starts_with("{{{") {
            let end = tail
                .find("}}}")
                .ok_or_else(|| AppError::Render("Unclosed '{{{' in template".to_string()))?;
            out.push_str(&tail[..end + 3]);
            rest = &tail[end + 3..];
            continue;
        }

        let end = tail[2..]
            .find("}}")
            .map(|i| i + 2)
            .ok_or_else(|| AppError::Render("Unclosed '{{' in template".to_string()))?;
        out.push_str(&translate_action(&tail[2..end], &mut open_blocks)?);
        rest = &tail[end + 2..];
    }
    out.push_str(rest);

    if let Some(block) = open_blocks.last() {
        return Err(AppError::Render(format!(
            "Unclosed '{{{{{} ...}}}}' block: missing '{{{{end}}}}'",
            block.keyword()
        )));
    }

    Ok(out)
}

/// Translate the text between one `{{` and `}}`.
fn translate_action(inner: &str, open_blocks: &mut Vec<Block>) -> AppResult<String> {
    let (open, inner) = match inner.strip_prefix("- ") {
        Some(stripped) => ("{{~", stripped),
        None => ("{{", inner),
    };
    let (close, inner) = match inner.strip_suffix(" -") {
        Some(stripped) => ("~}}", stripped),
        None => ("}}", inner),
    };
    let body = inner.trim();

    if body.starts_with("/*") {
        if !body.ends_with("*/") {
            return Err(AppError::Render(format!("Unterminated comment: {{{{{}}}}}", body)));
        }
        return Ok(String::new());
    }

    let (keyword, arg) = match body.split_once(char::is_whitespace) {
        Some((keyword, arg)) => (keyword, arg.trim()),
        None => (body, ""),
    };

    if let Some(block) = Block::from_keyword(keyword) {
        let arg = translate_argument(block.keyword(), arg)?;
        open_blocks.push(block);
        return Ok(format!("{}#{} {}{}", open, block.helper(), arg, close));
    }

    match keyword {
        "else" if arg.is_empty() => Ok(format!("{}else{}", open, close)),
        "else" if arg.starts_with('.') || arg.contains(" .") => Err(AppError::Render(format!(
            "Unsupported action '{{{{{}}}}}': nest an '{{{{if}}}}' inside '{{{{else}}}}' instead",
            body
        ))),
        "end" if arg.is_empty() => {
            let block = open_blocks
                .pop()
                .ok_or_else(|| AppError::Render("Unexpected '{{end}}' with no open block".to_string()))?;
            Ok(format!("{}/{}{}", open, block.helper(), close))
        }
        _ if body.starts_with('.') || body.starts_with('$') => {
            Ok(format!("{}{}{}", open, field_path(body)?, close))
        }
        _ => Ok(format!("{}{}{}", open, inner, close)),
    }
}

/// Translate the single argument of a block directive.
fn translate_argument(keyword: &str, arg: &str) -> AppResult<String> {
    if arg.is_empty() {
        return Err(AppError::Render(format!(
            "'{{{{{}}}}}' requires an argument",
            keyword
        )));
    }

    if arg.contains(char::is_whitespace) {
        return Err(AppError::Render(format!(
            "Unsupported pipeline in '{{{{{} {}}}}}': only a single field is allowed",
            keyword, arg
        )));
    }

    if arg.starts_with('.') || arg.starts_with('$') {
        field_path(arg)
    } else {
        Ok(arg.to_string())
    }
}

/// Convert `.a.b`, `.`, `$` and `$.a` into Handlebars paths.
fn field_path(token: &str) -> AppResult<String> {
    match token {
        "." => return Ok("this".to_string()),
        "$" => return Ok("@root".to_string()),
        _ => {}
    }

    let (prefix, path) = if let Some(path) = token.strip_prefix("$.") {
        ("@root.", path)
    } else if let Some(path) = token.strip_prefix('.') {
        ("", path)
    } else {
        return Err(invalid_path(token));
    };

    let valid = path.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_')
    });
    if !valid {
        return Err(invalid_path(token));
    }

    Ok(format!("{}{}", prefix, path))
}

fn invalid_path(token: &str) -> AppError {
    AppError::Render(format!("Invalid field path '{}'", token))
}
