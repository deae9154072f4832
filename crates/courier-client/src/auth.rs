//! Authorization binding.

/// Edge produced by an auth signal observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTransition {
    /// false -> true. The connection should open.
    Authorized,
    /// true -> false. The connection should close.
    Revoked,
    /// Same value as last time.
    Unchanged,
}

/// Edge detector over the external auth signal. Starts unauthorized.
#[derive(Debug, Clone, Default)]
pub struct AuthBinding {
    authorized: bool,
}

impl AuthBinding {
    /// Unauthorized binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed value.
    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Record a signal value and report the edge it forms.
    pub fn observe(&mut self, authorized: bool) -> AuthTransition {
        let transition = match (self.authorized, authorized) {
            (false, true) => AuthTransition::Authorized,
            (true, false) => AuthTransition::Revoked,
            _ => AuthTransition::Unchanged,
        };
        self.authorized = authorized;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_edges_only() {
        let mut auth = AuthBinding::new();

        assert_eq!(auth.observe(false), AuthTransition::Unchanged);
        assert_eq!(auth.observe(true), AuthTransition::Authorized);
        assert_eq!(auth.observe(true), AuthTransition::Unchanged);
        assert_eq!(auth.observe(false), AuthTransition::Revoked);
        assert_eq!(auth.observe(true), AuthTransition::Authorized);
        assert!(auth.is_authorized());
    }
}
