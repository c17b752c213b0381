pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short id for correlating log lines of a single join attempt.
pub fn new_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    uuid.as_bytes()
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}
