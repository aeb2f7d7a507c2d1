//! Rate limited logging.
//!
//! Intersection routines run millions of times per frame, a degenerate mesh would flood the
//! log if every occurence was reported. These macros log a given call site at most once.

#[macro_export]
macro_rules! log_once {
    (target: $target:expr, $lvl:expr, $($arg:tt)+) => {{
        use std::sync::Once;
        static ONCE: Once = Once::new();
        // The slot is only consumed once a logger is listening
        if log::log_enabled!(target: $target, $lvl) {
            ONCE.call_once(|| {
                log::log!(target: $target, $lvl, $($arg)+);
            });
        }
    }};
    ($lvl:expr, $($arg:tt)+) => ($crate::log_once!(target: module_path!(), $lvl, $($arg)+));
}

#[macro_export]
macro_rules! warn_once {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log_once!(target: $target, log::Level::Warn, $($arg)+)
    );
    ($($arg:tt)+) => ($crate::log_once!(log::Level::Warn, $($arg)+));
}

#[macro_export]
macro_rules! error_once {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log_once!(target: $target, log::Level::Error, $($arg)+)
    );
    ($($arg:tt)+) => ($crate::log_once!(log::Level::Error, $($arg)+));
}

#[cfg(test)]
mod tests {
    #[test]
    fn logs_without_logger() {
        // No logger installed: must neither panic nor consume anything observable
        for _ in 0..3 {
            crate::warn_once!("degenerate thing {}", 42);
            crate::error_once!(target: "rt_geom::test", "broken thing");
        }
    }
}
