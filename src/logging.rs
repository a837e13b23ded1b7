use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Initialize logging with timestamp, level and message.
///
/// Defaults to INFO; `RUST_LOG` overrides it.
/// Format: `[HH:MM:SS] [LEVEL] message`
pub fn init_logger() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_env(Env::default())
        .init();
}
