use std::sync::Once;

use log::LevelFilter;

static INIT: Once = Once::new();

/// Set up env_logger once per process. `RUST_LOG` still wins over these defaults.
pub fn init_logger(verbose: bool) {
    INIT.call_once(|| {
        let own_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
        env_logger::Builder::new()
            .filter_level(LevelFilter::Warn)
            .filter_module("roadstat", own_level)
            .filter_module("reqwest", LevelFilter::Warn)
            .filter_module("rustls", LevelFilter::Warn)
            .parse_env("RUST_LOG")
            .format_timestamp_secs()
            .format_target(false)
            .format_module_path(false)
            .init();

        log::debug!("logging initialized (verbose: {verbose})");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_logger(false);
        init_logger(true);
    }
}
