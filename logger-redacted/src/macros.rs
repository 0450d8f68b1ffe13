// Logging macros that redact a named identifier field before emitting.
//
// Usage: `redacted_info!(identifier = raw_value, role = %role, "Login succeeded")`
// The first field is passed through `logger_redacted::redact`; the rest are
// forwarded to tracing untouched.

#[macro_export]
macro_rules! redacted_info {
    ($field:ident = $value:expr, $($arg:tt)*) => {
        tracing::info!($field = %$crate::redact(&$value), $($arg)*)
    };
}

#[macro_export]
macro_rules! redacted_warn {
    ($field:ident = $value:expr, $($arg:tt)*) => {
        tracing::warn!($field = %$crate::redact(&$value), $($arg)*)
    };
}
