//! log macro's for scheduler and simulation logging

/// Writes a debug! message to the app::scheduler logger
#[macro_export]
macro_rules! sched_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::scheduler", $($arg)+)
    };
}

/// Writes an info! message to the app::scheduler logger
#[macro_export]
macro_rules! sched_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::scheduler", $($arg)+)
    };
}

/// Writes an warn! message to the app::scheduler logger
#[macro_export]
macro_rules! sched_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::scheduler", $($arg)+)
    };
}

/// Writes an error! message to the app::scheduler logger
#[macro_export]
macro_rules! sched_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::scheduler", $($arg)+)
    };
}

/// Writes a debug! message to the app::simulation logger
#[macro_export]
macro_rules! sim_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::simulation", $($arg)+)
    };
}

/// Writes an info! message to the app::simulation logger
#[macro_export]
macro_rules! sim_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::simulation", $($arg)+)
    };
}

/// Writes an warn! message to the app::simulation logger
#[macro_export]
macro_rules! sim_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::simulation", $($arg)+)
    };
}

/// Writes an error! message to the app::simulation logger
#[macro_export]
macro_rules! sim_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::simulation", $($arg)+)
    };
}
