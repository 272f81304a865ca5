use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::{self, Write};

/// Environment variable naming a file that receives every log record.
pub const LOG_FILE_ENV: &str = "HOMELINK_LOG_FILE";

/// Initialize logging for the binary.
///
/// With `HOMELINK_LOG_FILE` set, records go to that file at debug level;
/// otherwise `env_logger` reads `RUST_LOG` and writes to stderr.
pub fn init_logger() {
    match std::env::var(LOG_FILE_ENV) {
        Ok(path) if !path.is_empty() => {
            if let Err(err) = init_file_logger(&path) {
                eprintln!("Failed to initialize file logger at '{path}': {err}");
                env_logger::init();
            }
        }
        _ => env_logger::init(),
    }
}

fn init_file_logger(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(file)))
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .init();

    log::info!("File logger initialized at {path}");

    Ok(())
}
