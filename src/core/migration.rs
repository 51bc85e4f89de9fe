//! Migration scripts and the migration file format.
//!
//! A migration file is plain SQL annotated with directive comments:
//!
//! ```sql
//! -- +migrate Up
//! CREATE TABLE units (id INTEGER PRIMARY KEY, title TEXT NOT NULL);
//!
//! -- +migrate StatementBegin
//! CREATE TRIGGER units_touch AFTER UPDATE ON units BEGIN
//!     UPDATE units SET title = title WHERE id = NEW.id;
//! END;
//! -- +migrate StatementEnd
//!
//! -- +migrate Down
//! DROP TABLE units;
//! ```
//!
//! Statements are treated as opaque text: the parser only splits sections
//! and statements, it never interprets SQL.

use crate::core::error::{ErpkitError, Result};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;

/// File extension that marks a container file as a migration.
pub const MIGRATION_EXT: &str = ".sql";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A parsed migration. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    id: String,
    module: String,
    up: Vec<String>,
    down: Vec<String>,
    checksum: String,
}

impl MigrationScript {
    /// Ledger identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Contributing module. Diagnostic only, not part of the identity.
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn up(&self) -> &[String] {
        &self.up
    }

    pub fn down(&self) -> &[String] {
        &self.down
    }

    pub fn statements(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// Hex SHA-256 of the raw file contents.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

/// Derives the script ID from a container-relative path: separators are
/// normalized to `/` and the `.sql` extension is dropped.
pub fn script_id(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let trimmed = normalized.trim_start_matches("./");
    trimmed
        .strip_suffix(MIGRATION_EXT)
        .unwrap_or(trimmed)
        .to_string()
}

pub fn is_migration_file(path: &str) -> bool {
    path.ends_with(MIGRATION_EXT)
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^--\s*\+migrate\s+(\S+)(.*)$").expect("static regex")
    })
}

/// Cuts a trailing `--` comment. Dashes inside quoted strings or
/// identifiers are not comments.
fn strip_line_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'-' if bytes.get(i + 1) == Some(&b'-') => return &line[..i],
                _ => {}
            },
        }
        i += 1;
    }
    line
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

struct Parser<'a> {
    file: &'a str,
    section: Section,
    seen_up: bool,
    seen_down: bool,
    in_block: Option<usize>,
    buffer: String,
    up: Vec<String>,
    down: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(file: &'a str) -> Self {
        Self {
            file,
            section: Section::Preamble,
            seen_up: false,
            seen_down: false,
            in_block: None,
            buffer: String::new(),
            up: Vec::new(),
            down: Vec::new(),
        }
    }

    fn err(&self, line: usize, reason: impl Into<String>) -> ErpkitError {
        ErpkitError::ParseError {
            file: self.file.to_string(),
            line,
            reason: reason.into(),
        }
    }

    fn flush(&mut self) {
        let stmt = self.buffer.trim();
        let stmt = stmt.strip_suffix(';').unwrap_or(stmt).trim_end();
        if !stmt.is_empty() {
            let stmt = stmt.to_string();
            match self.section {
                Section::Up => self.up.push(stmt),
                Section::Down => self.down.push(stmt),
                Section::Preamble => {}
            }
        }
        self.buffer.clear();
    }

    fn directive(&mut self, line_no: usize, name: &str, rest: &str) -> Result<()> {
        match name.to_ascii_lowercase().as_str() {
            "up" | "down" => {
                if self.in_block.is_some() {
                    return Err(self.err(line_no, "section change inside StatementBegin block"));
                }
                if rest.split_whitespace().any(|opt| opt.eq_ignore_ascii_case("notransaction")) {
                    return Err(self.err(
                        line_no,
                        "notransaction is not supported; plans always run in one transaction",
                    ));
                }
                if let Some(opt) = rest.split_whitespace().next() {
                    return Err(self.err(line_no, format!("unknown option '{}'", opt)));
                }
                self.flush();
                if name.eq_ignore_ascii_case("up") {
                    if self.seen_up {
                        return Err(self.err(line_no, "duplicate Up section"));
                    }
                    if self.seen_down {
                        return Err(self.err(line_no, "Up section must precede Down section"));
                    }
                    self.seen_up = true;
                    self.section = Section::Up;
                } else {
                    if self.seen_down {
                        return Err(self.err(line_no, "duplicate Down section"));
                    }
                    self.seen_down = true;
                    self.section = Section::Down;
                }
            }
            "statementbegin" => {
                if self.section == Section::Preamble {
                    return Err(self.err(line_no, "StatementBegin before any Up/Down section"));
                }
                if self.in_block.is_some() {
                    return Err(self.err(line_no, "nested StatementBegin"));
                }
                self.flush();
                self.in_block = Some(line_no);
            }
            "statementend" => {
                if self.in_block.is_none() {
                    return Err(self.err(line_no, "StatementEnd without StatementBegin"));
                }
                self.in_block = None;
                self.flush();
            }
            other => return Err(self.err(line_no, format!("unknown directive '{}'", other))),
        }
        Ok(())
    }

    fn line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let trimmed = line.trim();
        if let Some(caps) = directive_re().captures(trimmed) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let rest = caps.get(2).map_or("", |m| m.as_str());
            return self.directive(line_no, name, rest);
        }

        if self.section == Section::Preamble {
            if trimmed.is_empty() || trimmed.starts_with("--") {
                return Ok(());
            }
            return Err(self.err(line_no, "statement before the first '-- +migrate Up' directive"));
        }

        if self.in_block.is_none() && (trimmed.is_empty() || trimmed.starts_with("--")) && self.buffer.trim().is_empty() {
            return Ok(());
        }

        if self.in_block.is_none() {
            let code = strip_line_comment(line).trim_end();
            if code.ends_with(';') {
                self.buffer.push_str(code);
                self.flush();
                return Ok(());
            }
        }

        self.buffer.push_str(line);
        self.buffer.push('\n');
        Ok(())
    }

    fn finish(mut self) -> Result<(Vec<String>, Vec<String>)> {
        if let Some(start) = self.in_block {
            return Err(self.err(start, "StatementBegin is never closed by StatementEnd"));
        }
        if !self.seen_up {
            return Err(self.err(0, "missing '-- +migrate Up' directive"));
        }
        self.flush();
        Ok((self.up, self.down))
    }
}

/// Parses one migration file. `file` is the diagnostic name used in errors;
/// `path` is the container-relative path the ID is derived from.
pub fn parse_migration(module: &str, file: &str, path: &str, contents: &str) -> Result<MigrationScript> {
    let mut parser = Parser::new(file);
    for (idx, line) in contents.lines().enumerate() {
        parser.line(idx + 1, line)?;
    }
    let (up, down) = parser.finish()?;

    let checksum = Sha256::digest(contents.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>();

    Ok(MigrationScript {
        id: script_id(path),
        module: module.to_string(),
        up,
        down,
        checksum,
    })
}
