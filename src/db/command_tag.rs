//! Statement classification and command-tag reconstruction.
//!
//! A statement whose trimmed text starts with `select` (any case) produces rows;
//! everything else runs as a mutation. `WITH ... SELECT` and `EXPLAIN SELECT`
//! therefore take the mutation path.
//!
//! sqlx surfaces only the affected-row count of a simple-protocol execution, so
//! the PostgreSQL command tag is rebuilt from the statement text. Uses
//! [sqlparser](https://docs.rs/sqlparser/) with the PostgreSQL dialect; the last
//! statement of a batch decides the tag.

use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Words that may sit between `CREATE` and the object kind without being part
/// of the tag (`CREATE OR REPLACE VIEW` is tagged `CREATE VIEW`).
const CREATE_MODIFIERS: &[&str] = &[
    "OR",
    "REPLACE",
    "UNIQUE",
    "TEMP",
    "TEMPORARY",
    "UNLOGGED",
    "GLOBAL",
    "LOCAL",
    "RECURSIVE",
    "TRUSTED",
    "PROCEDURAL",
    "DEFAULT",
];

/// Object kinds spelled with two words.
const TWO_WORD_OBJECTS: &[&str] = &[
    "MATERIALIZED",
    "FOREIGN",
    "EVENT",
    "TEXT",
    "OPERATOR",
    "ACCESS",
    "USER",
];

/// Whether `statement` takes the row-set path.
pub fn is_row_query(statement: &str) -> bool {
    statement
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
}

/// Best-effort affected-row count: the trailing token of `status` when it is
/// entirely digits.
pub fn parse_rows_affected(status: &str) -> Option<u64> {
    let last = status.split_whitespace().last()?;
    if last.bytes().all(|b| b.is_ascii_digit()) {
        last.parse().ok()
    } else {
        None
    }
}

/// Rebuild the command tag PostgreSQL would have reported for `statement`.
pub fn command_tag(statement: &str, rows_affected: u64) -> String {
    let dialect = PostgreSqlDialect {};
    match Parser::parse_sql(&dialect, statement) {
        Ok(statements) => match statements.last() {
            Some(last) => tag_for_parsed(last, statement, rows_affected),
            None => String::new(),
        },
        Err(e) => {
            tracing::debug!(error = %e, "Statement not parsed; tagging from keywords");
            keyword_tag(last_statement_text(statement), rows_affected)
        }
    }
}

fn tag_for_parsed(stmt: &Statement, text: &str, rows: u64) -> String {
    match stmt {
        Statement::Insert(_) => format!("INSERT 0 {rows}"),
        Statement::Update { .. } => format!("UPDATE {rows}"),
        Statement::Delete(_) => format!("DELETE {rows}"),
        Statement::Merge { .. } => format!("MERGE {rows}"),
        Statement::Copy { .. } => format!("COPY {rows}"),
        // Populating a new relation from a query reports the rows selected
        Statement::CreateTable(create) if create.query.is_some() => format!("SELECT {rows}"),
        Statement::CreateView(view) if view.materialized => format!("SELECT {rows}"),
        // Data-modifying CTEs are tagged by their outer verb
        Statement::Query(query) => match query.body.as_ref() {
            SetExpr::Insert(_) => format!("INSERT 0 {rows}"),
            SetExpr::Update(_) => format!("UPDATE {rows}"),
            SetExpr::Delete(_) => format!("DELETE {rows}"),
            SetExpr::Merge(_) => format!("MERGE {rows}"),
            _ => format!("SELECT {rows}"),
        },
        _ => keyword_tag(last_statement_text(text), rows),
    }
}

/// Text of the last non-empty `;`-separated segment.
fn last_statement_text(text: &str) -> &str {
    text.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or("")
}

/// Upper-cased leading keywords, skipping line comments.
fn leading_words(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        })
        .flat_map(str::split_whitespace)
        .map(|word| {
            word.trim_end_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .to_ascii_uppercase()
        })
        .take(8)
        .collect()
}

fn keyword_tag(text: &str, rows: u64) -> String {
    let words = leading_words(text);
    let Some(verb) = words.first() else {
        return String::new();
    };

    match verb.as_str() {
        "INSERT" => format!("INSERT 0 {rows}"),
        "UPDATE" | "DELETE" | "MERGE" | "COPY" | "SELECT" | "FETCH" | "MOVE" => {
            format!("{verb} {rows}")
        }
        "WITH" | "VALUES" | "TABLE" => format!("SELECT {rows}"),
        "START" | "BEGIN" => "BEGIN".to_string(),
        "END" | "COMMIT" => "COMMIT".to_string(),
        "ABORT" | "ROLLBACK" => "ROLLBACK".to_string(),
        "TRUNCATE" => "TRUNCATE TABLE".to_string(),
        "CREATE" | "DROP" | "ALTER" => {
            let mut object = words[1..]
                .iter()
                .skip_while(|w| verb == "CREATE" && CREATE_MODIFIERS.contains(&w.as_str()));
            match object.next() {
                Some(first) if TWO_WORD_OBJECTS.contains(&first.as_str()) => match object.next() {
                    Some(second) => format!("{verb} {first} {second}"),
                    None => format!("{verb} {first}"),
                },
                Some(first) => format!("{verb} {first}"),
                None => verb.clone(),
            }
        }
        _ => verb.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_prefix_is_row_query() {
        assert!(is_row_query("SELECT 1"));
        assert!(is_row_query("  select * from t"));
        assert!(is_row_query("\n\tSeLeCt now()"));
        assert!(is_row_query("selectivity"));
    }

    #[test]
    fn test_non_select_prefixes_are_mutations() {
        assert!(!is_row_query("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!is_row_query("EXPLAIN SELECT 1"));
        assert!(!is_row_query("-- note\nSELECT 1"));
        assert!(!is_row_query("INSERT INTO t VALUES (1)"));
        assert!(!is_row_query(""));
        assert!(!is_row_query("sel"));
    }

    #[test]
    fn test_parse_rows_affected() {
        assert_eq!(parse_rows_affected("INSERT 0 3"), Some(3));
        assert_eq!(parse_rows_affected("UPDATE 0"), Some(0));
        assert_eq!(parse_rows_affected("DELETE 12"), Some(12));
        assert_eq!(parse_rows_affected("CREATE TABLE"), None);
        assert_eq!(parse_rows_affected(""), None);
        assert_eq!(parse_rows_affected("SELECT -1"), None);
    }

    #[test]
    fn test_dml_tags_carry_counts() {
        assert_eq!(command_tag("INSERT INTO t (a) VALUES (1), (2)", 2), "INSERT 0 2");
        assert_eq!(command_tag("UPDATE t SET a = 1", 5), "UPDATE 5");
        assert_eq!(command_tag("DELETE FROM t WHERE a > 1", 0), "DELETE 0");
        assert_eq!(
            command_tag("WITH x AS (SELECT 1 AS a) SELECT * FROM x", 1),
            "SELECT 1"
        );
    }

    #[test]
    fn test_ddl_tags_have_no_count() {
        assert_eq!(command_tag("CREATE TABLE t (id int)", 0), "CREATE TABLE");
        assert_eq!(command_tag("create unique index i on t (id)", 0), "CREATE INDEX");
        assert_eq!(command_tag("CREATE OR REPLACE VIEW v AS SELECT 1", 0), "CREATE VIEW");
        assert_eq!(command_tag("DROP TABLE IF EXISTS t", 0), "DROP TABLE");
        assert_eq!(command_tag("ALTER TABLE t ADD COLUMN b text", 0), "ALTER TABLE");
        assert_eq!(command_tag("TRUNCATE t", 0), "TRUNCATE TABLE");
        assert_eq!(parse_rows_affected(&command_tag("CREATE TABLE t (id int)", 0)), None);
    }

    #[test]
    fn test_populating_create_reports_selected_rows() {
        assert_eq!(
            command_tag("CREATE TABLE t2 AS SELECT * FROM t", 3),
            "SELECT 3"
        );
        assert_eq!(
            command_tag("CREATE MATERIALIZED VIEW mv AS SELECT 1", 1),
            "SELECT 1"
        );
        assert_eq!(
            command_tag("CREATE VIEW v AS SELECT 1", 0),
            "CREATE VIEW"
        );
        assert_eq!(
            parse_rows_affected(&command_tag("CREATE TABLE t2 AS SELECT 1", 1)),
            Some(1)
        );
    }

    #[test]
    fn test_data_modifying_ctes_take_outer_verb() {
        assert_eq!(
            command_tag("WITH gone AS (SELECT 1) DELETE FROM t WHERE a = 1", 1),
            "DELETE 1"
        );
        assert_eq!(
            command_tag("WITH x AS (SELECT 1) UPDATE t SET a = 2", 4),
            "UPDATE 4"
        );
        assert_eq!(
            command_tag("WITH x AS (SELECT 1) INSERT INTO t SELECT * FROM x", 1),
            "INSERT 0 1"
        );
    }

    #[test]
    fn test_last_statement_decides() {
        assert_eq!(
            command_tag("CREATE TABLE t (id int); INSERT INTO t VALUES (1)", 1),
            "INSERT 0 1"
        );
        assert_eq!(
            command_tag("INSERT INTO t VALUES (1); DROP TABLE t;", 1),
            "DROP TABLE"
        );
    }

    #[test]
    fn test_unparsed_statements_fall_back_to_keywords() {
        assert_eq!(command_tag("VACUUM", 0), "VACUUM");
        assert_eq!(command_tag("begin", 0), "BEGIN");
        assert_eq!(
            command_tag("CREATE OR REPLACE FUNCTION f() RETURNS int LANGUAGE sql AS $$ SELECT 1 $$ ???", 0),
            "CREATE FUNCTION"
        );
        assert_eq!(command_tag("INSERT INTO t VALUES (", 0), "INSERT 0 0");
    }
}
