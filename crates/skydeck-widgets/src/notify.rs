/// Shown when a lookup names a city the weather service does not know
pub const NOT_FOUND_MESSAGE: &str = "Incorrect city name. Please check the input";

/// Capability: transient user notification (toast/snackbar).
///
/// Fire-and-forget; implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}
