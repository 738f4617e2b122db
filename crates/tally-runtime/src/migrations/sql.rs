use std::future::Future;
use std::iter::Peekable;
use std::str::Chars;

use sqlx::PgPool;
use tracing::debug;

use tally_core::error::{Result, TallyError};

const UP_MARKER: &str = "-- @up";
const DOWN_MARKER: &str = "-- @down";

/// Runs a list of SQL statements as one unit of work.
pub trait SqlExecutor: Clone + Send + Sync {
    fn execute_script(&self, statements: &[String]) -> impl Future<Output = Result<()>> + Send;
}

impl SqlExecutor for PgPool {
    /// All statements run in a single transaction.
    async fn execute_script(&self, statements: &[String]) -> Result<()> {
        let mut tx = self
            .begin()
            .await
            .map_err(|e| TallyError::Database(format!("Failed to begin transaction: {}", e)))?;

        for statement in statements {
            debug!(statement = %statement, "Executing statement");
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| TallyError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| TallyError::Database(format!("Failed to commit: {}", e)))
    }
}

/// A migration file split into its forward and reverse statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlScript {
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl SqlScript {
    /// Split a file on its `-- @up` / `-- @down` markers.
    ///
    /// Text before any marker belongs to the up section, so a file without
    /// markers is forward-only.
    pub fn parse(content: &str) -> Self {
        let mut up = String::new();
        let mut down = String::new();
        let mut in_down = false;

        for line in content.lines() {
            let marker = line.trim().to_ascii_lowercase();
            if marker == UP_MARKER {
                in_down = false;
                continue;
            }
            if marker == DOWN_MARKER {
                in_down = true;
                continue;
            }

            let section = if in_down { &mut down } else { &mut up };
            section.push_str(line);
            section.push('\n');
        }

        Self {
            up: split_sql_statements(&up),
            down: split_sql_statements(&down),
        }
    }

    pub fn is_reversible(&self) -> bool {
        !self.down.is_empty()
    }
}

/// Lexical context of the splitter.
enum Scan {
    Code,
    /// Inside a `'...'` literal or a `"..."` identifier.
    Quoted(char),
    LineComment,
    /// Nesting depth of `/* */` comments.
    BlockComment(u32),
    Dollar(String),
}

/// Split SQL into individual statements.
///
/// A `;` only ends a statement in plain code: quoted literals and
/// identifiers, comments and dollar-quoted bodies are passed through intact.
/// A doubled `''` needs no special case since it closes and immediately
/// reopens the literal. Leading comment lines are stripped and
/// comment-only fragments are dropped.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = Scan::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        match &mut state {
            Scan::Code => match c {
                '\'' | '"' => state = Scan::Quoted(c),
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    current.push('-');
                    state = Scan::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    current.push('*');
                    state = Scan::BlockComment(1);
                }
                '$' => {
                    if let Some(tag) = read_dollar_tag(&mut chars, &mut current) {
                        state = Scan::Dollar(tag);
                    }
                }
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                }
                _ => {}
            },
            Scan::Quoted(quote) => {
                if c == *quote {
                    state = Scan::Code;
                }
            }
            Scan::LineComment => {
                if c == '\n' {
                    state = Scan::Code;
                }
            }
            Scan::BlockComment(depth) => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push('/');
                    if *depth == 1 {
                        state = Scan::Code;
                    } else {
                        *depth -= 1;
                    }
                } else if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    current.push('*');
                    *depth += 1;
                }
            }
            Scan::Dollar(open) => {
                if c == '$' {
                    if let Some(tag) = read_dollar_tag(&mut chars, &mut current) {
                        if tag == *open {
                            state = Scan::Code;
                        }
                    }
                }
            }
        }
    }

    push_statement(&mut statements, &current);
    statements
}

/// Read the rest of a dollar-quote tag like `$$` or `$body$` after its
/// opening `$`. Positional parameters such as `$1` are not tags.
fn read_dollar_tag(chars: &mut Peekable<Chars<'_>>, current: &mut String) -> Option<String> {
    let mut tag = String::from("$");
    while let Some(&next) = chars.peek() {
        if next == '$' {
            chars.next();
            current.push(next);
            tag.push(next);
            return Some(tag);
        }

        let leading_digit = tag.len() == 1 && next.is_ascii_digit();
        if (next.is_alphanumeric() || next == '_') && !leading_digit {
            chars.next();
            current.push(next);
            tag.push(next);
        } else {
            return None;
        }
    }
    None
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let mut rest = raw.trim();
    while rest.starts_with("--") {
        rest = rest.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
    }

    let stmt = rest.trim_end_matches(';').trim_end();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
}
