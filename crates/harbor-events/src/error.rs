/// Rejection returned by a vetoing subscriber.
///
/// A veto aborts delivery to the remaining subscribers and is handed back to
/// the publisher, which must abort the change that triggered the event.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("vetoed: {reason}")]
pub struct Veto {
    /// Human-readable reason, surfaced to the pushing client.
    pub reason: String,
}

impl Veto {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
