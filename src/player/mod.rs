//! Plays recorded tapes into a mock server.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ports::mock_server::{Matcher, MockServer, Rule};
use crate::tape::{
    read_tape, BodyContent, Exchange, Headers, RequestRecord, ResponseRecord, Tape, TapeError,
};

/// Headers that are recorded but never handed to the mock server matcher.
const IGNORED_HEADERS: &[&str] = &["Transfer-Encoding"];

const CORS_HEADER: &str = "Access-Control-Allow-Origin";

/// Installs tape exchanges as rules on a [`MockServer`].
#[derive(Debug)]
pub struct Player<S> {
    server: S,
    add_cors: bool,
}

impl<S: MockServer> Player<S> {
    /// Create a player that installs rules on `server`.
    pub fn new(server: S) -> Self {
        Self { server, add_cors: false }
    }

    /// Add `Access-Control-Allow-Origin: *` to every installed response.
    #[must_use]
    pub fn with_cors(mut self, add_cors: bool) -> Self {
        self.add_cors = add_cors;
        self
    }

    /// Install one rule per exchange, in tape order.
    ///
    /// No deduplication happens here; overlapping rules are resolved by the
    /// server.
    pub fn play(&self, tape: &[Exchange]) {
        for exchange in tape {
            let matcher = matcher(&exchange.request);
            debug!(method = %matcher.method, path = %matcher.path, "installing rule");
            let rule = self.server.on(matcher);
            self.respond(rule, &exchange.response);
        }
    }

    /// Read the tape at `path`, play it, and hand the tape back.
    ///
    /// Nothing is installed if the tape fails to load.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: &Path) -> Result<Tape, TapeError> {
        let tape = read_tape(path)?;
        self.play(&tape);
        Ok(tape)
    }

    /// Wrap `test` so the tape at `path` is installed before it runs.
    ///
    /// The returned closure yields whatever `test` returns, or the tape error
    /// without running `test`.
    pub fn load<'a, F, T>(
        &'a self,
        path: impl Into<PathBuf>,
        test: F,
    ) -> impl FnOnce() -> Result<T, TapeError> + 'a
    where
        F: FnOnce() -> T + 'a,
    {
        let path = path.into();
        move || {
            self.load_file(&path)?;
            Ok(test())
        }
    }

    fn respond(&self, rule: S::Rule, response: &ResponseRecord) {
        let mut headers = response.headers.clone();
        if self.add_cors {
            let headers = headers.get_or_insert_with(Headers::new);
            headers.retain(|name, _| !name.eq_ignore_ascii_case(CORS_HEADER));
            headers.insert(CORS_HEADER.to_string(), "*".to_string());
        }
        match (&response.json, &response.text) {
            (Some(json), _) => rule.json(json.clone(), response.code, headers),
            (None, Some(text)) => rule.text(text.clone(), response.code, headers),
            (None, None) => rule.status(response.code, headers),
        }
    }
}

fn matcher(request: &RequestRecord) -> Matcher {
    Matcher {
        method: request.method.clone(),
        path: request.path.clone(),
        headers: matched_headers(request.headers.as_ref()),
        body: request_body(request),
    }
}

fn matched_headers(headers: Option<&Headers>) -> Option<Headers> {
    let headers = headers.filter(|headers| !headers.is_empty())?;
    let mut filtered = headers.clone();
    filtered.retain(|name, _| !IGNORED_HEADERS.iter().any(|ignored| name.eq_ignore_ascii_case(ignored)));
    Some(filtered)
}

/// Pick the body matcher: files, then json, then form, then text.
fn request_body(request: &RequestRecord) -> BodyContent {
    if let Some(files) = &request.files {
        return BodyContent::Multipart { files: files.clone(), form: request.form.clone() };
    }
    if let Some(json) = &request.json {
        return BodyContent::Json(json.clone());
    }
    if let Some(form) = &request.form {
        return BodyContent::Form(form.clone());
    }
    match &request.text {
        Some(text) => BodyContent::Text(text.clone()),
        None => BodyContent::Empty,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::tape::parse_tape;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    enum Reply {
        Json(serde_json::Value, u16, Option<Headers>),
        Text(String, u16, Option<Headers>),
        Status(u16, Option<Headers>),
    }

    type Installed = Rc<RefCell<Vec<(Matcher, Option<Reply>)>>>;

    #[derive(Default)]
    struct FakeServer {
        rules: Installed,
    }

    struct FakeRule {
        rules: Installed,
        index: usize,
    }

    impl FakeRule {
        fn set(self, reply: Reply) {
            self.rules.borrow_mut()[self.index].1 = Some(reply);
        }
    }

    impl MockServer for FakeServer {
        type Rule = FakeRule;

        fn on(&self, matcher: Matcher) -> Self::Rule {
            let mut rules = self.rules.borrow_mut();
            rules.push((matcher, None));
            FakeRule { rules: Rc::clone(&self.rules), index: rules.len() - 1 }
        }
    }

    impl Rule for FakeRule {
        fn json(self, body: serde_json::Value, code: u16, headers: Option<Headers>) {
            self.set(Reply::Json(body, code, headers));
        }

        fn text(self, body: String, code: u16, headers: Option<Headers>) {
            self.set(Reply::Text(body, code, headers));
        }

        fn status(self, code: u16, headers: Option<Headers>) {
            self.set(Reply::Status(code, headers));
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    fn exchange(request: RequestRecord, response: ResponseRecord) -> Exchange {
        Exchange { request, response }
    }

    fn post(path: &str) -> RequestRecord {
        RequestRecord { path: path.into(), method: "POST".into(), ..RequestRecord::default() }
    }

    #[test]
    fn installs_rules_in_tape_order() {
        let server = FakeServer::default();
        let tape = vec![
            exchange(
                RequestRecord { json: Some(json!({"name": "John"})), ..post("/api/users") },
                ResponseRecord { code: 201, json: Some(json!({"id": 42})), ..Default::default() },
            ),
            exchange(
                RequestRecord { json: Some(json!({"name": "Jane"})), ..post("/api/users") },
                ResponseRecord { code: 201, json: Some(json!({"id": 43})), ..Default::default() },
            ),
        ];

        Player::new(&server).play(&tape);

        let rules = server.rules.borrow();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].0.body, BodyContent::Json(json!({"name": "John"})));
        assert_eq!(rules[1].0.body, BodyContent::Json(json!({"name": "Jane"})));
        assert_eq!(rules[0].1, Some(Reply::Json(json!({"id": 42}), 201, None)));
        assert_eq!(rules[1].1, Some(Reply::Json(json!({"id": 43}), 201, None)));
    }

    #[test]
    fn strips_transfer_encoding_from_matcher() {
        let server = FakeServer::default();
        let request = RequestRecord {
            headers: Some(headers(&[
                ("Content-Type", "application/json"),
                ("transfer-encoding", "chunked"),
            ])),
            ..post("/api/users")
        };
        Player::new(&server).play(&[exchange(request, ResponseRecord { code: 200, ..Default::default() })]);

        let rules = server.rules.borrow();
        assert_eq!(rules[0].0.headers, Some(headers(&[("Content-Type", "application/json")])));
    }

    #[test]
    fn missing_headers_match_on_method_and_path_only() {
        let server = FakeServer::default();
        Player::new(&server)
            .play(&[exchange(post("/api/users"), ResponseRecord { code: 200, ..Default::default() })]);

        let rules = server.rules.borrow();
        assert_eq!(rules[0].0.method, "POST");
        assert_eq!(rules[0].0.path, "/api/users");
        assert_eq!(rules[0].0.headers, None);
        assert_eq!(rules[0].0.body, BodyContent::Empty);
        assert_eq!(rules[0].1, Some(Reply::Status(200, None)));
    }

    #[test]
    fn body_precedence_is_files_json_form_text() {
        let tape = parse_tape(
            "
- request:
    path: /upload
    method: POST
    form:
      kind: avatar
    files:
      image:
        a.png: bytes
  response:
    code: 200
- request:
    path: /form
    method: POST
    form:
      dude: Lebowski
    text: ignored
  response:
    code: 200
- request:
    path: /text
    method: POST
    text: Dude
  response:
    code: 200
",
        )
        .unwrap();
        let server = FakeServer::default();
        Player::new(&server).play(&tape);

        let rules = server.rules.borrow();
        match &rules[0].0.body {
            BodyContent::Multipart { files, form } => {
                assert_eq!(files["image"]["a.png"].as_bytes(), b"bytes");
                assert_eq!(form.as_ref().unwrap()["kind"], "avatar");
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
        assert!(matches!(&rules[1].0.body, BodyContent::Form(form) if form["dude"] == "Lebowski"));
        assert_eq!(rules[2].0.body, BodyContent::Text("Dude".into()));
    }

    #[test]
    fn responds_with_text_or_status() {
        let server = FakeServer::default();
        let content_type = headers(&[("Content-Type", "text/html")]);
        Player::new(&server).play(&[
            exchange(
                post("/a"),
                ResponseRecord {
                    code: 200,
                    headers: Some(content_type.clone()),
                    text: Some("<h1>Boom</h1>".into()),
                    json: None,
                },
            ),
            exchange(
                post("/b"),
                ResponseRecord { code: 204, headers: Some(content_type.clone()), ..Default::default() },
            ),
        ]);

        let rules = server.rules.borrow();
        assert_eq!(
            rules[0].1,
            Some(Reply::Text("<h1>Boom</h1>".into(), 200, Some(content_type.clone())))
        );
        assert_eq!(rules[1].1, Some(Reply::Status(204, Some(content_type))));
    }

    #[test]
    fn cors_header_is_added_when_enabled() {
        let server = FakeServer::default();
        let player = Player::new(&server).with_cors(true);
        player.play(&[
            exchange(
                post("/a"),
                ResponseRecord {
                    code: 200,
                    headers: Some(headers(&[
                        ("Content-Type", "text/html"),
                        ("access-control-allow-origin", "https://a.test"),
                    ])),
                    text: Some("ok".into()),
                    json: None,
                },
            ),
            exchange(post("/b"), ResponseRecord { code: 200, ..Default::default() }),
        ]);

        let rules = server.rules.borrow();
        assert_eq!(
            rules[0].1,
            Some(Reply::Text(
                "ok".into(),
                200,
                Some(headers(&[("Access-Control-Allow-Origin", "*"), ("Content-Type", "text/html")]))
            ))
        );
        assert_eq!(
            rules[1].1,
            Some(Reply::Status(200, Some(headers(&[("Access-Control-Allow-Origin", "*")]))))
        );
    }

    #[test]
    fn load_file_installs_and_returns_tape() {
        let dir = std::env::temp_dir().join("httpvcr_player_load_file_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tape.yaml");
        std::fs::write(
            &path,
            "- request:\n    path: /a\n    method: GET\n  response:\n    code: 200\n\
             - request:\n    path: /b\n    method: DELETE\n  response:\n    code: 204\n",
        )
        .unwrap();

        let server = FakeServer::default();
        let tape = Player::new(&server).load_file(&path).unwrap();

        assert_eq!(tape.len(), 2);
        assert_eq!(tape[1].request.method, "DELETE");
        let rules = server.rules.borrow();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].0.path, "/b");
        assert_eq!(rules[1].1, Some(Reply::Status(204, None)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_installs_tape_before_running_test() {
        let dir = std::env::temp_dir().join("httpvcr_player_load_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tape.yaml");
        std::fs::write(&path, "- request:\n    path: /\n    method: GET\n  response:\n    code: 200\n")
            .unwrap();

        let server = FakeServer::default();
        let player = Player::new(&server);
        let wrapped = player.load(&path, || server.rules.borrow().len());
        assert_eq!(wrapped().unwrap(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_reports_parse_errors_without_running_test() {
        let dir = std::env::temp_dir().join("httpvcr_player_load_bad_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tape.yaml");
        std::fs::write(&path, "- request: [").unwrap();

        let server = FakeServer::default();
        let player = Player::new(&server);
        let ran = RefCell::new(false);
        let result = player.load(&path, || *ran.borrow_mut() = true)();

        assert!(matches!(result, Err(TapeError::Parse(_))));
        assert!(!*ran.borrow());
        assert!(server.rules.borrow().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
