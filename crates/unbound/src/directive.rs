//! Parser for the `unbound` directive of a server block:
//!
//! ```text
//! unbound [FROM...] {
//!     except IGNORED_NAMES...
//!     option NAME VALUE
//!     config FILENAME
//!     anchor FILENAME
//! }
//! ```
//!
//! Directives of other plugins in the same server block are skipped, blocks included.

use std::vec::IntoIter;

use crate::{
    config::{Setting, UnboundConfig},
    error::ConfigError,
};

const NAME: &str = "unbound";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

impl Token {
    fn is(&self, s: &str) -> bool {
        !self.quoted && self.text == s
    }
}

#[derive(Debug)]
struct Line {
    number: usize,
    tokens: Vec<Token>,
}

impl Line {
    fn opens_block(&self) -> bool {
        self.tokens.last().is_some_and(|t| t.is("{"))
    }
}

type Lines = IntoIter<Line>;

/// Parse the `unbound` directive out of the body of a server block.
pub fn parse(input: &str) -> Result<UnboundConfig, ConfigError> {
    let mut lines = tokenize(input)?.into_iter();
    let mut found = None;

    while let Some(line) = lines.next() {
        if line.tokens[0].is("}") {
            return Err(ConfigError::Syntax {
                line: line.number,
                message: "unexpected '}' outside of a block".into(),
            });
        }
        if !line.tokens[0].is(NAME) {
            if line.opens_block() {
                skip_block(&mut lines, line.number)?;
            }
            continue;
        }

        if found.is_some() {
            return Err(ConfigError::Duplicate { line: line.number });
        }

        let opens = line.opens_block();
        let mut args = line.tokens;
        if opens {
            args.pop();
        }
        let from = args
            .into_iter()
            .skip(1)
            .map(|t| unquoted_arg(t, line.number))
            .collect::<Result<Vec<_>, _>>()?;

        let mut config = UnboundConfig {
            from,
            ..Default::default()
        };
        if opens {
            parse_block(&mut lines, &mut config, line.number)?;
        }
        found = Some(config);
    }

    found.ok_or(ConfigError::Missing)
}

fn parse_block(lines: &mut Lines, config: &mut UnboundConfig, opened_at: usize) -> Result<(), ConfigError> {
    loop {
        let Some(line) = lines.next() else {
            return Err(ConfigError::Syntax {
                line: opened_at,
                message: "unclosed block, expected '}'".into(),
            });
        };
        let number = line.number;

        let mut tokens = line.tokens.into_iter();
        let Some(name) = tokens.next() else { continue };
        let args = tokens
            .map(|t| unquoted_arg(t, number))
            .collect::<Result<Vec<_>, _>>()?;

        if name.is("}") {
            if !args.is_empty() {
                return Err(ConfigError::Syntax {
                    line: number,
                    message: format!("unexpected '{}' after '}}'", args[0]),
                });
            }
            return Ok(());
        }

        match name.text.as_str() {
            "except" => {
                if args.is_empty() {
                    return Err(arg_count(number, "except", "at least 1", 0));
                }
                config.except.extend(args);
            }
            "option" => {
                let [key, value] = exactly::<2>(args, number, "option", "2")?;
                config.settings.push(Setting::Option { key, value });
            }
            "config" => {
                let [path] = exactly::<1>(args, number, "config", "1")?;
                config.settings.push(Setting::Config { path: path.into() });
            }
            "anchor" => {
                let [path] = exactly::<1>(args, number, "anchor", "1")?;
                config.settings.push(Setting::Anchor { path: path.into() });
            }
            _ => {
                return Err(ConfigError::UnknownProperty {
                    line: number,
                    name: name.text,
                });
            }
        }
    }
}

fn skip_block(lines: &mut Lines, opened_at: usize) -> Result<(), ConfigError> {
    let mut depth = 1usize;
    for line in lines.by_ref() {
        for token in &line.tokens {
            if token.is("{") {
                depth += 1;
            } else if token.is("}") {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }
    Err(ConfigError::Syntax {
        line: opened_at,
        message: "unclosed block, expected '}'".into(),
    })
}

fn exactly<const N: usize>(
    args: Vec<String>,
    line: usize,
    directive: &'static str,
    expected: &'static str,
) -> Result<[String; N], ConfigError> {
    let got = args.len();
    args.try_into().map_err(|_| arg_count(line, directive, expected, got))
}

fn arg_count(line: usize, directive: &'static str, expected: &'static str, got: usize) -> ConfigError {
    ConfigError::ArgumentCount {
        line,
        directive,
        expected,
        got,
    }
}

/// Braces are only allowed where a block opens or closes.
fn unquoted_arg(token: Token, line: usize) -> Result<String, ConfigError> {
    if token.is("{") || token.is("}") {
        return Err(ConfigError::Syntax {
            line,
            message: format!("unexpected '{}'", token.text),
        });
    }
    Ok(token.text)
}

/// Split `input` into non-empty lines of tokens.
///
/// Tokens are separated by whitespace. `#` starts a comment that runs to the end of the line.
/// Double quotes group whitespace into one token; `\"` and `\\` are escapes inside them.
fn tokenize(input: &str) -> Result<Vec<Line>, ConfigError> {
    let mut lines = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let number = idx + 1;
        let mut tokens = Vec::new();
        let mut chars = raw.chars().peekable();

        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}

            match chars.peek() {
                None | Some('#') => break,
                Some('"') => {
                    chars.next();
                    let mut text = String::new();
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some('\\') => match chars.next() {
                                Some(c @ ('"' | '\\')) => text.push(c),
                                Some(c) => {
                                    text.push('\\');
                                    text.push(c);
                                }
                                None => text.push('\\'),
                            },
                            Some(c) => text.push(c),
                            None => {
                                return Err(ConfigError::Syntax {
                                    line: number,
                                    message: "unterminated quoted string".into(),
                                });
                            }
                        }
                    }
                    tokens.push(Token { text, quoted: true });
                }
                Some(_) => {
                    let mut text = String::new();
                    while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                        text.push(c);
                    }
                    tokens.push(Token { text, quoted: false });
                }
            }
        }

        if !tokens.is_empty() {
            lines.push(Line { number, tokens });
        }
    }

    Ok(lines)
}

#[cfg(test)]
#[path = "directive_tests.rs"]
mod directive_tests;
