//! Application events

use serde_json::Value;

/// An application-defined event stored in the log
///
/// The log treats events as opaque apart from the `type` discriminator,
/// which every event must carry. Events are stored and returned verbatim.
pub trait Event: Clone + Send + Sync + 'static {
    /// The event's type discriminator, or `None` if it has none
    fn event_type(&self) -> Option<&str>;
}

/// JSON events carry their discriminator in a string `type` field
impl Event for Value {
    fn event_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }
}
