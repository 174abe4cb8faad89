use crate::types::{ActivityType, Attributes};

/// Classify an attribute bag by the keys it carries.
///
/// `outcome`/`event` mean a selection, `status`/`sport` an event, anything
/// else a sport. Callers route correctly by always supplying the parent
/// foreign key (`sport` for events, `event` for selections).
pub fn resolve(attrs: &Attributes) -> ActivityType {
    let has = |key: &str| attrs.contains_key(key);

    if has("outcome") || has("event") {
        ActivityType::Selection
    } else if has("status") || has("sport") {
        ActivityType::Event
    } else {
        ActivityType::Sport
    }
}
