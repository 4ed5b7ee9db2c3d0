use std::sync::Once;

static INIT: Once = Once::new();

/// Configure `env_logger` once per process. Safe to call repeatedly;
/// only the first call has any effect.
pub fn init_log() {
    INIT.call_once(|| {
        use std::io::Write;

        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format_timestamp_micros()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {}] {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}
