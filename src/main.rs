use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use log::error;
use tinysql::ast::Statement;
use tinysql::{Database, Outcome, Results, Value, parse};

#[derive(Parser, Debug)]
#[command(name = "tinysql")]
#[command(about = "Interactive shell for the tinysql in-memory SQL engine")]
#[command(version)]
struct Cli {
    /// Execute the given SQL and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Prompt printed before each line
    #[arg(long, default_value = "# ")]
    prompt: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str()))
        .init();

    let mut db = Database::new();
    let mut out = io::stdout().lock();

    let result = match &cli.command {
        Some(sql) => execute_line(&mut db, sql, &mut out),
        None => run_repl(&mut db, &mut io::stdin().lock(), &mut out, &cli.prompt).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("i/o failure: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Reads lines until end of input or a quit command, executing each one.
fn run_repl<R, W>(db: &mut Database, input: &mut R, out: &mut W, prompt: &str) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(out, "Welcome to tinysql.")?;
    let mut line = String::new();

    loop {
        write!(out, "{prompt}")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }

        let trimmed = line.trim();
        if matches!(trimmed, "quit" | "exit" | "\\q") {
            return Ok(());
        }
        if trimmed.is_empty() {
            continue;
        }

        execute_line(db, trimmed, out)?;
    }
}

/// Executes every statement of `sql`, printing results and errors to
/// `out`. Returns whether all statements succeeded.
fn execute_line<W: Write>(db: &mut Database, sql: &str, out: &mut W) -> io::Result<bool> {
    let ast = match parse(sql) {
        Ok(ast) => ast,
        Err(err) => {
            writeln!(out, "Error while parsing: {err}")?;
            return Ok(false);
        }
    };

    for statement in &ast.statements {
        let action = match statement {
            Statement::CreateTable(_) => "creating table",
            Statement::Insert(_) => "inserting values",
            Statement::Select(_) => "selecting values",
            Statement::DropTable(_) => "dropping table",
        };

        match db.execute_statement(statement) {
            Ok(Outcome::Selected(results)) => write_results(&results, out)?,
            Ok(_) => {}
            Err(err) => {
                writeln!(out, "Error {action}: {err}")?;
                return Ok(false);
            }
        }
    }

    writeln!(out, "ok")?;
    Ok(true)
}

fn render_cell(value: Value) -> String {
    match value {
        Value::Bool(true) => "t".to_string(),
        Value::Bool(false) => "f".to_string(),
        other => other.to_string(),
    }
}

/// Prints `results` as a borderless table followed by a row count.
fn write_results<W: Write>(results: &Results, out: &mut W) -> io::Result<()> {
    if results.rows.is_empty() {
        return writeln!(out, "(no results)");
    }

    let header: Vec<String> = results.columns.iter().map(|column| column.name.clone()).collect();
    let rows: Vec<Vec<String>> = results
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&results.columns)
                .map(|(cell, column)| render_cell(Value::decode(cell, column.column_type)))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    for row in &rows {
        for (width, text) in widths.iter_mut().zip(row) {
            *width = (*width).max(text.chars().count());
        }
    }

    let format_row = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(text, width)| format!("{text:<width$}"))
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    writeln!(out, "{}", format_row(&header))?;
    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(out, "{}", separator.join("-+-"))?;
    for row in &rows {
        writeln!(out, "{}", format_row(row))?;
    }

    if rows.len() == 1 {
        writeln!(out, "(1 result)")
    } else {
        writeln!(out, "({} results)", rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn repl(script: &str) -> String {
        let mut db = Database::new();
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        run_repl(&mut db, &mut input, &mut out, "# ").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_repl_renders_table() {
        let output = repl(
            "CREATE TABLE users (id INT, name TEXT);\n\
             INSERT INTO users VALUES (1, 'Alice');\n\
             INSERT INTO users VALUES (22, 'Bo');\n\
             SELECT id, name, id = 1 AS first FROM users;\n",
        );

        let expected = "id | name  | first\n\
                        ---+-------+------\n\
                        1  | Alice | t\n\
                        22 | Bo    | f\n\
                        (2 results)\n";
        assert!(output.contains(expected), "got: {output}");
        assert!(output.starts_with("Welcome to tinysql.\n# ok\n"));
    }

    #[test]
    fn test_repl_single_and_empty_results() {
        let output = repl("SELECT 1;\nCREATE TABLE t (a INT);\nSELECT a FROM t;\n");
        assert!(output.contains("(1 result)\nok"));
        assert!(output.contains("(no results)\nok"));
    }

    #[test]
    fn test_repl_reports_errors_and_continues() {
        let output = repl("SELECT 'abc\nINSERT INTO nope VALUES (1)\nSELECT 1 + 'x'\nSELECT 2\n");

        assert!(output.contains("Error while parsing: Unable to lex token"));
        assert!(output.contains("Error inserting values: Table does not exist: nope"));
        assert!(output.contains("Error selecting values: Invalid operands"));
        assert!(output.contains("?column?\n--------\n2\n(1 result)"));
    }

    #[test]
    fn test_repl_quit_stops_reading() {
        let output = repl("quit\nSELECT 1\n");
        assert_eq!(output, "Welcome to tinysql.\n# ");
    }

    #[test]
    fn test_execute_line_status() {
        let mut db = Database::new();
        let mut out = Vec::new();

        assert!(execute_line(&mut db, "CREATE TABLE t (a INT)", &mut out).unwrap());
        assert!(!execute_line(&mut db, "CREATE TABLE t (a INT)", &mut out).unwrap());

        let output = String::from_utf8(out).unwrap();
        assert_eq!(output, "ok\nError creating table: Table already exists: t\n");
    }
}
