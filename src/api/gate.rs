//! Authorization seam for administrative routes
//!
//! The floor does not authenticate anyone. It asks a gate whether a request
//! may perform an administrative action and trusts the answer.

/// Decides whether a request may run an administrative operation
pub trait AccessGate: Send + Sync {
    fn is_authorized(&self, bearer_token: Option<&str>) -> bool;
}

/// Static shared-secret gate. Without a configured token every request
/// passes.
#[derive(Debug, Clone, Default)]
pub struct BearerTokenGate {
    token: Option<String>,
}

impl BearerTokenGate {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl AccessGate for BearerTokenGate {
    fn is_authorized(&self, bearer_token: Option<&str>) -> bool {
        match &self.token {
            None => true,
            Some(expected) => bearer_token == Some(expected.as_str()),
        }
    }
}
