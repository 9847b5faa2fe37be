use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::fs;
use std::path::Path;

use crate::api::parking_config_dto::LogSettingsDto;
use crate::domain::parking_system_model::utils::audit::AUDIT_TARGET;

/// Picks the effective level: an explicit flag wins over `RUST_LOG`, which
/// wins over the configured level. Unparsable values are skipped; the
/// fallback is `info`.
pub fn effective_level(flag: Option<&str>, env: Option<&str>, configured: Option<&str>) -> LevelFilter {
    [flag, env, configured]
        .into_iter()
        .flatten()
        .find_map(|raw| raw.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Initializes the global logger.
///
/// Call once, early in `main`. Console output is colored and goes to stderr
/// without audit lines; the file at `<dir>/<file>` receives everything. When
/// the file cannot be opened the logger runs console-only.
pub fn init(settings: &LogSettingsDto, level_flag: Option<&str>) {
    let env_level = std::env::var("RUST_LOG").ok();
    let level = effective_level(level_flag, env_level.as_deref(), settings.level.as_deref());

    let base = Dispatch::new().level(level).level_for("serde", LevelFilter::Warn).level_for("csv", LevelFilter::Warn);

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console = Dispatch::new()
        .filter(|metadata| metadata.target() != AUDIT_TARGET)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let log_path = Path::new(&settings.dir).join(&settings.file);
    let file = fs::create_dir_all(&settings.dir).and_then(|_| fern::log_file(&log_path));

    let dispatch = match file {
        Ok(file) => base.chain(console).chain(
            Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "[{} {} {}] {}",
                        Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .chain(file),
        ),
        Err(e) => {
            eprintln!("Cannot write log file '{}': {}; logging to the console only.", log_path.display(), e);
            base.chain(console)
        }
    };

    if let Err(e) = dispatch.apply() {
        eprintln!("Failed to apply logger configuration: {}", e);
        return;
    }

    log::debug!("Logger initialized at level {} with file '{}'.", level, log_path.display());
}
