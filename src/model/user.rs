/// The user record belongs to the user-service; the gateway stores whatever
/// JSON the profile endpoint returned and replays it as-is.
pub type User = serde_json::Value;
