use uuid::Uuid;

/// Opaque per-conversation identifier, minted client-side.
///
/// The backend uses it to correlate conversation history; nothing on this
/// side validates it and it is never persisted across runs. Starting a new
/// conversation replaces the id rather than mutating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random identifier. Uniqueness is advisory at this scale.
    pub fn new() -> Self {
        Self(format!("user-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionId;

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn ids_carry_the_user_prefix() {
        assert!(SessionId::new().as_str().starts_with("user-"));
    }
}
