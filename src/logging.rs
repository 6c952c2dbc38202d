use std::io::Write;
use std::sync::Once;

use log::LevelFilter;

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are no-ops.
///
/// `level` overrides the default of `info`; `RUST_LOG` still wins for
/// per-module filters.
pub fn init_logging(level: Option<&str>) {
    let level = level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    INIT.call_once(|| {
        let _ = env_logger::Builder::new()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} - {} - {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level(),
                    record.args()
                )
            })
            .filter(None, level)
            .parse_default_env()
            .try_init();
    });
}
