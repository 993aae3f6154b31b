//! Stand-in for the embulk binary used by the integration tests
//!
//! Speaks just enough of the tool's surface for the bridge: a guess pass
//! that completes the config and advertises a Content-Length, a run pass
//! that writes a believable log and loads ten known rows into the
//! configured table, and failure modes switched through FAKE_EMBULK_*
//! environment variables or an `unknown_plugin` input type.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;

const ROWS: i64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("--version") => {
            println!("embulk 0.11.0 (fake)");
            Ok(())
        }
        Some("guess") => guess(&args),
        Some("run") => run(&args).await,
        _ => {
            eprintln!("Usage: embulk run <config.yml>");
            std::process::exit(64);
        }
    }
}

fn input_type(config: &serde_yaml::Value) -> Option<&str> {
    config.get("in")?.get("type")?.as_str()
}

fn guess(args: &[String]) -> Result<()> {
    let config_path = args.get(1).context("guess needs a config path")?;
    let out_path = args.get(3).context("guess needs an output path")?;

    let text = std::fs::read_to_string(config_path)?;
    let mut config: serde_yaml::Value = serde_yaml::from_str(&text)?;

    if input_type(&config) == Some("unknown_plugin") {
        println!("Error: Unknown input plugin 'unknown_plugin'");
        std::process::exit(1);
    }

    // Pretend the input was sampled over HTTP.
    println!("2024-01-09 12:00:00.000 [DEBUG] (main): GET /input/part_01.csv.gz");
    let content_length: u64 = std::env::var("FAKE_EMBULK_CONTENT_LENGTH")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2000);
    println!("Content-Length: {}", content_length);

    let parser: serde_yaml::Value = serde_yaml::from_str(
        "\
charset: UTF-8
newline: LF
type: csv
delimiter: ','
quote: '\"'
header_line: true
columns:
  - {name: id, type: long}
  - {name: key, type: string}
  - {name: value, type: long}
",
    )?;
    let input = config
        .get_mut("in")
        .and_then(|v| v.as_mapping_mut())
        .context("config has no in section")?;
    input.insert(serde_yaml::Value::from("parser"), parser);

    std::fs::write(out_path, serde_yaml::to_string(&config)?)?;
    println!("Guessed the configuration into {}", out_path);
    Ok(())
}

async fn run(args: &[String]) -> Result<()> {
    if std::env::var("FAKE_EMBULK_USAGE").is_ok() {
        eprintln!("embulk: invalid arguments");
        eprintln!("Usage: embulk run <config.yml>");
        eprintln!("    -b, --bundle BUNDLE_DIR");
        std::process::exit(64);
    }

    let config_path = args.get(1).context("run needs a config path")?;
    let log_path = args.get(3).context("run needs a log path")?;

    let text = std::fs::read_to_string(config_path)?;
    let config: serde_yaml::Value = serde_yaml::from_str(&text)?;

    if input_type(&config) == Some("unknown_plugin") {
        println!("2024-01-09 12:00:01.000 [INFO] (main): Loading plugins");
        println!("Error: Unknown input plugin 'unknown_plugin'");
        eprintln!("java.lang.RuntimeException: unknown input plugin");
        eprintln!("        at org.embulk.exec.Fake.run(Fake.java:1)");
        std::process::exit(1);
    }

    // The real tool reports run-phase config errors on stdout.
    let out = config.get("out");
    let out_type = out.and_then(|v| v.get("type")).and_then(|v| v.as_str());
    if out_type != Some("sqlite") {
        println!("2024-01-09 12:00:01.000 [INFO] (main): Loading plugins");
        println!("Error: Unknown output plugin '{}'", out_type.unwrap_or("none"));
        std::process::exit(1);
    }
    let location = out.and_then(|v| v.get("location")).and_then(|v| v.as_str());
    let table = out.and_then(|v| v.get("table")).and_then(|v| v.as_str());
    let (location, table) = match (location, table) {
        (Some(location), Some(table)) => (location, table),
        _ => {
            println!("Error: sqlite output needs 'location' and 'table'");
            std::process::exit(1);
        }
    };

    // Two input files, each carrying half the decompressed bytes.
    let mut log = String::new();
    log.push_str(
        "2024-01-09 12:00:02.000 [INFO] (0001:transaction): Loading files/part_01.csv.gz (1,000 bytes)\n",
    );
    log.push_str(
        "2024-01-09 12:00:03.000 [INFO] (0001:transaction): Loading files/part_02.csv.gz (1,000 bytes)\n",
    );
    if std::env::var("FAKE_EMBULK_WARN").is_ok() {
        log.push_str(
            "2024-01-09 12:00:04.000 [WARN] (0001:task-0000): csv-parser: coerced a null into 0\n",
        );
    }
    std::fs::write(log_path, &log)?;

    // Linger so a progress monitor can observe the log mid-run.
    let stall_ms: u64 = std::env::var("FAKE_EMBULK_STALL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if stall_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(stall_ms)).await;
    }

    load_rows(location, table).await?;

    println!("2024-01-09 12:00:05.000 [INFO] (main): Committed {} rows", ROWS);
    Ok(())
}

async fn load_rows(location: &str, table: &str) -> Result<()> {
    let url = format!("sqlite://{}?mode=rwc", location);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await?;

    let sql = format!(
        "INSERT INTO \"{}\" (id, key, value) VALUES (?, ?, ?)",
        table.replace('"', "\"\"")
    );
    for i in 1..=ROWS {
        sqlx::query(&sql)
            .bind(i)
            .bind(format!("key{}", i))
            .bind(i)
            .execute(&pool)
            .await?;
    }
    Ok(())
}
