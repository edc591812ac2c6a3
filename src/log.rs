#![allow(unused_imports, unused_macros)]
use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! log_debug {
            ($($arg:tt)*) => {
                ::defmt::debug!($($arg)*)
            };
        }
        macro_rules! log_warn {
            ($($arg:tt)*) => {
                ::defmt::warn!($($arg)*)
            };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! log_debug {
            ($($arg:tt)*) => {
                ::log::debug!($($arg)*)
            };
        }
        macro_rules! log_warn {
            ($($arg:tt)*) => {
                ::log::warn!($($arg)*)
            };
        }
    } else {
        macro_rules! log_debug {
            ($($arg:tt)*) => {{
                let _ = format_args!($($arg)*);
            }};
        }
        macro_rules! log_warn {
            ($($arg:tt)*) => {{
                let _ = format_args!($($arg)*);
            }};
        }
    }
}

pub(crate) use log_debug;
pub(crate) use log_warn;
