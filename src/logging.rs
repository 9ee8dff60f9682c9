use {
    chrono::{Local, NaiveDate},
    std::{
        fs::{self, OpenOptions},
        path::{Path, PathBuf},
    },
    tracing::level_filters::LevelFilter,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// One log file per day under `log_dir`.
pub fn log_file_path(log_dir: &Path, day: NaiveDate) -> PathBuf {
    log_dir.join(format!("duet-{}.log", day.format("%Y-%m-%d")))
}

/// Installs the global subscriber: compact console output plus an
/// append-only daily file. `RUST_LOG` overrides the level picked by `debug`.
pub fn init_logging(debug: bool, log_dir: &str) -> std::io::Result<PathBuf> {
    let log_dir = PathBuf::from(log_dir);
    fs::create_dir_all(&log_dir)?;

    let log_file = log_file_path(&log_dir, Local::now().date_naive());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let console_layer = fmt::layer().with_target(false).with_ansi(true).compact();

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_target(false)
        .with_ansi(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging to: {}", log_file.display());

    Ok(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_is_named_by_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            log_file_path(Path::new("logs"), day),
            PathBuf::from("logs/duet-2024-03-09.log")
        );
    }
}
