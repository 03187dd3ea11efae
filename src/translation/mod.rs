use std::borrow::Cow;
use std::fmt::Write as _;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, try_ordinal_placeholder,
};
use scanner::{State, is_identifier_byte};

use crate::error::MssqlConnectionError;
use crate::types::RowValues;

/// Placeholder syntax a driver accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// ODBC-style positional markers `?`, bound strictly in order of appearance.
    Positional,
    /// SQL Server RPC-style ordinals `@P1`, `@P2`, ...
    Ordinal,
}

/// A statement rewritten for a driver together with the parameters in bind order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement<'a> {
    pub sql: Cow<'a, str>,
    pub params: Vec<RowValues>,
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    Positional,
    Ordinal(usize),
}

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    start: usize,
    end: usize,
    marker: Marker,
}

/// Bind `params` into `sql` for a driver using `target` placeholders.
///
/// The statement may use either `?` markers (one parameter per marker, in order) or
/// 1-based ordinals `@p1`..`@pN` (any order, any number of repeats), but not both.
/// Markers inside string literals, quoted or bracketed identifiers and comments are
/// left alone. The SQL is borrowed unchanged when no rewrite is needed.
///
/// # Errors
/// Returns `MssqlConnectionError::ParameterError` when placeholder styles are mixed, an
/// ordinal has no parameter, a parameter is never referenced, or the positional marker
/// count differs from the parameter count.
pub fn bind_placeholders<'a>(
    sql: &'a str,
    params: &[RowValues],
    target: PlaceholderStyle,
) -> Result<BoundStatement<'a>, MssqlConnectionError> {
    let occurrences = scan_placeholders(sql);
    let positional = occurrences
        .iter()
        .filter(|o| matches!(o.marker, Marker::Positional))
        .count();
    let ordinal = occurrences.len() - positional;

    if positional > 0 && ordinal > 0 {
        return Err(MssqlConnectionError::ParameterError(
            "cannot mix '?' and '@pN' placeholders in one statement".to_string(),
        ));
    }

    if ordinal > 0 {
        check_ordinals(&occurrences, params.len())?;
    } else if positional != params.len() {
        return Err(MssqlConnectionError::ParameterError(format!(
            "statement has {positional} placeholders but {} parameters were supplied",
            params.len()
        )));
    }

    if occurrences.is_empty() {
        return Ok(BoundStatement {
            sql: Cow::Borrowed(sql),
            params: Vec::new(),
        });
    }

    let (sql, bound) = match target {
        PlaceholderStyle::Positional if ordinal == 0 => (Cow::Borrowed(sql), params.to_vec()),
        PlaceholderStyle::Positional => {
            let mut bound = Vec::with_capacity(occurrences.len());
            let rewritten = rewrite(sql, &occurrences, |out, marker| {
                if let Marker::Ordinal(n) = marker {
                    bound.push(params[n - 1].clone());
                }
                out.push('?');
            });
            (Cow::Owned(rewritten), bound)
        }
        PlaceholderStyle::Ordinal => {
            let mut next = 0usize;
            let rewritten = rewrite(sql, &occurrences, |out, marker| {
                let n = match marker {
                    Marker::Ordinal(n) => n,
                    Marker::Positional => {
                        next += 1;
                        next
                    }
                };
                let _ = write!(out, "@P{n}");
            });
            (Cow::Owned(rewritten), params.to_vec())
        }
    };

    Ok(BoundStatement { sql, params: bound })
}

fn check_ordinals(occurrences: &[Occurrence], supplied: usize) -> Result<(), MssqlConnectionError> {
    let mut referenced = vec![false; supplied];
    for occurrence in occurrences {
        if let Marker::Ordinal(n) = occurrence.marker {
            if n == 0 || n > supplied {
                return Err(MssqlConnectionError::ParameterError(format!(
                    "placeholder @p{n} has no parameter ({supplied} supplied)"
                )));
            }
            referenced[n - 1] = true;
        }
    }
    if let Some(unused) = referenced.iter().position(|used| !used) {
        return Err(MssqlConnectionError::ParameterError(format!(
            "parameter {} is never referenced",
            unused + 1
        )));
    }
    Ok(())
}

fn rewrite(sql: &str, occurrences: &[Occurrence], mut emit: impl FnMut(&mut String, Marker)) -> String {
    let mut out = String::with_capacity(sql.len() + occurrences.len() * 3);
    let mut copied = 0;
    for occurrence in occurrences {
        out.push_str(&sql[copied..occurrence.start]);
        emit(&mut out, occurrence.marker);
        copied = occurrence.end;
    }
    out.push_str(&sql[copied..]);
    out
}

fn scan_placeholders(sql: &str) -> Vec<Occurrence> {
    let mut found = Vec::new();
    walk_code(sql, |bytes, idx| match bytes[idx] {
        b'?' => {
            found.push(Occurrence {
                start: idx,
                end: idx + 1,
                marker: Marker::Positional,
            });
            idx
        }
        b'@' => match try_ordinal_placeholder(bytes, idx) {
            Some((end, ordinal)) => {
                found.push(Occurrence {
                    start: idx,
                    end,
                    marker: Marker::Ordinal(ordinal),
                });
                end - 1
            }
            None => idx,
        },
        _ => idx,
    });
    found
}

/// Statement keywords that modify rows without producing a result set.
const ROW_FREE_WRITES: [&str; 4] = ["INSERT", "UPDATE", "DELETE", "MERGE"];

/// True when `sql` is a single INSERT, UPDATE, DELETE or MERGE with no `OUTPUT`
/// clause, so running it can only report an affected-row count.
///
/// Anything else, including batches and statements led by `WITH`, counts as possibly
/// returning rows.
#[must_use]
pub fn is_row_free_write(sql: &str) -> bool {
    let tokens = code_tokens(sql);
    let mut tokens = tokens.as_slice();
    while let Some((last, rest)) = tokens.split_last()
        && *last == ";"
    {
        tokens = rest;
    }
    let Some(first) = tokens.first() else {
        return false;
    };
    ROW_FREE_WRITES
        .iter()
        .any(|keyword| first.eq_ignore_ascii_case(keyword))
        && !tokens
            .iter()
            .any(|token| *token == ";" || token.eq_ignore_ascii_case("OUTPUT"))
}

/// Words and statement separators outside literals, quoted identifiers and comments.
fn code_tokens(sql: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    walk_code(sql, |bytes, idx| {
        let b = bytes[idx];
        if b == b';' {
            tokens.push(";");
            return idx;
        }
        if !is_identifier_byte(b) || (idx > 0 && is_identifier_byte(bytes[idx - 1])) {
            return idx;
        }
        let mut end = idx;
        while end < bytes.len() && is_identifier_byte(bytes[end]) {
            end += 1;
        }
        if let Some(word) = sql.get(idx..end) {
            tokens.push(word);
        }
        end - 1
    });
    tokens
}

/// Call `visit(bytes, idx)` for each byte of `sql` that is plain code, skipping
/// literals, quoted or bracketed identifiers and comments. `visit` returns the index
/// of the last byte it consumed.
fn walk_code(sql: &str, mut visit: impl FnMut(&[u8], usize) -> usize) {
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                _ => idx = visit(bytes, idx),
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
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
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    idx += 1;
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                }
            }
        }
        idx += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[&str]) -> Vec<RowValues> {
        values.iter().map(|v| RowValues::from(*v)).collect()
    }

    #[test]
    fn ordinals_become_positional_in_occurrence_order() {
        let params = text(&["a", "b"]);
        let bound = bind_placeholders(
            "select * from t where x = @p2 or y = @P1 or z = @p2",
            &params,
            PlaceholderStyle::Positional,
        )
        .unwrap();
        assert_eq!(bound.sql, "select * from t where x = ? or y = ? or z = ?");
        assert_eq!(bound.params, text(&["b", "a", "b"]));
    }

    #[test]
    fn positional_becomes_ordinal() {
        let params = text(&["a", "b"]);
        let bound =
            bind_placeholders("insert into t values (?, ?)", &params, PlaceholderStyle::Ordinal)
                .unwrap();
        assert_eq!(bound.sql, "insert into t values (@P1, @P2)");
        assert_eq!(bound.params, params);
    }

    #[test]
    fn positional_passthrough_borrows() {
        let params = text(&["a"]);
        let bound =
            bind_placeholders("select ?", &params, PlaceholderStyle::Positional).unwrap();
        assert!(matches!(bound.sql, Cow::Borrowed(_)));
    }

    #[test]
    fn skips_literals_identifiers_and_comments() {
        let sql = "select '?', [a?b], \"@p9\" -- ? @p3\n/* @p4 /* ? */ */ from t where a = @p1";
        let bound =
            bind_placeholders(sql, &text(&["v"]), PlaceholderStyle::Positional).unwrap();
        assert_eq!(
            bound.sql,
            "select '?', [a?b], \"@p9\" -- ? @p3\n/* @p4 /* ? */ */ from t where a = ?"
        );
    }

    #[test]
    fn variables_and_system_functions_are_not_placeholders() {
        let sql = "declare @p1x int; select @@p1, @p1";
        let bound =
            bind_placeholders(sql, &text(&["v"]), PlaceholderStyle::Positional).unwrap();
        assert_eq!(bound.sql, "declare @p1x int; select @@p1, ?");
    }

    #[test]
    fn rejects_mixed_styles() {
        let err = bind_placeholders("select ?, @p1", &text(&["a", "b"]), PlaceholderStyle::Positional)
            .unwrap_err();
        assert!(matches!(err, MssqlConnectionError::ParameterError(_)));
    }

    #[test]
    fn rejects_missing_and_unused_parameters() {
        assert!(bind_placeholders("select @p2", &text(&["a"]), PlaceholderStyle::Positional).is_err());
        assert!(bind_placeholders("select @p0", &text(&["a"]), PlaceholderStyle::Positional).is_err());
        assert!(
            bind_placeholders("select @p1", &text(&["a", "b"]), PlaceholderStyle::Positional).is_err()
        );
        assert!(bind_placeholders("select ?", &[], PlaceholderStyle::Positional).is_err());
        assert!(bind_placeholders("select 1", &text(&["a"]), PlaceholderStyle::Positional).is_err());
    }

    #[test]
    fn no_placeholders_no_params_is_untouched() {
        let bound = bind_placeholders("select 1", &[], PlaceholderStyle::Ordinal).unwrap();
        assert_eq!(bound.sql, "select 1");
        assert!(bound.params.is_empty());
    }

    #[test]
    fn plain_writes_are_row_free() {
        assert!(is_row_free_write("UPDATE t SET a = @P1 WHERE id = @P2"));
        assert!(is_row_free_write("  -- bump\n delete from t;"));
        assert!(is_row_free_write("/* seed */ INSERT INTO t SELECT * FROM s"));
        assert!(is_row_free_write("MERGE t USING s ON t.id = s.id WHEN MATCHED THEN DELETE;"));
    }

    #[test]
    fn writes_that_may_return_rows_are_not_row_free() {
        assert!(!is_row_free_write("SELECT * FROM t"));
        assert!(!is_row_free_write("INSERT INTO t OUTPUT inserted.id VALUES (1)"));
        assert!(!is_row_free_write("UPDATE t SET a = 1; SELECT @@ROWCOUNT"));
        assert!(!is_row_free_write("WITH x AS (SELECT 1 AS n) DELETE FROM t"));
        assert!(!is_row_free_write("EXEC dbo.purge"));
        assert!(!is_row_free_write("-- UPDATE only in a comment"));
        assert!(!is_row_free_write(""));
    }

    #[test]
    fn keywords_inside_literals_are_ignored() {
        assert!(is_row_free_write("UPDATE t SET note = 'OUTPUT; SELECT' WHERE [output] = 1"));
    }
}
