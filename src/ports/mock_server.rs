//! Mock server port: the capability the player installs fixtures into.

use crate::tape::{BodyContent, Headers};

/// Describes the requests a rule should answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    /// HTTP method to match.
    pub method: String,
    /// Path, including any query string, to match.
    pub path: String,
    /// Headers the request must carry. `None` matches on method, path and
    /// body only.
    pub headers: Option<Headers>,
    /// Expected request body.
    pub body: BodyContent,
}

/// A mock HTTP server that can be taught canned responses.
///
/// When several rules match the same request, which one answers is the
/// server's own policy.
pub trait MockServer {
    /// Rule handle returned by [`MockServer::on`].
    type Rule: Rule;

    /// Register a new rule for requests described by `matcher`.
    fn on(&self, matcher: Matcher) -> Self::Rule;
}

/// Finalizes a registered rule with the response it should give.
pub trait Rule {
    /// Respond with a JSON body.
    fn json(self, body: serde_json::Value, code: u16, headers: Option<Headers>);

    /// Respond with a text body.
    fn text(self, body: String, code: u16, headers: Option<Headers>);

    /// Respond with a status and headers only.
    fn status(self, code: u16, headers: Option<Headers>);
}

impl<S: MockServer + ?Sized> MockServer for &S {
    type Rule = S::Rule;

    fn on(&self, matcher: Matcher) -> Self::Rule {
        (**self).on(matcher)
    }
}
