// Session context handed to every component that talks to the API.

/// The caller's session, passed explicitly into the gate and the submission
/// path. Token storage and refresh belong to the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    bearer_token: Option<String>,
}

impl SessionContext {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        SessionContext {
            bearer_token: (!token.trim().is_empty()).then_some(token),
        }
    }

    /// A session with no token; requests go out unauthenticated.
    pub fn anonymous() -> Self {
        SessionContext::default()
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Value for the `Authorization` header, if a token is present.
    pub fn authorization_header(&self) -> Option<String> {
        self.bearer_token.as_ref().map(|t| format!("Bearer {t}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_anonymous() {
        assert_eq!(SessionContext::new("  "), SessionContext::anonymous());
        assert_eq!(SessionContext::new("").authorization_header(), None);
    }

    #[test]
    fn header_uses_bearer_scheme() {
        let session = SessionContext::new("abc.def");
        assert_eq!(session.bearer_token(), Some("abc.def"));
        assert_eq!(
            session.authorization_header().as_deref(),
            Some("Bearer abc.def")
        );
    }
}
