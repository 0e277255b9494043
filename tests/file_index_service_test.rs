//! Tests for FileIndexService: createidx and upload against a scripted HTTP client

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rstest::rstest;
use serde_json::{json, Value};
use tempfile::TempDir;

use fabric_cli_ext::application::services::{CreateIndexOptions, FileIndexService, UploadOptions};
use fabric_cli_ext::application::sidetree::{commitment, public_key_from_pem, Jwk};
use fabric_cli_ext::application::{MSG_ABORTED, MSG_CONTINUE_OR_ABORT};
use fabric_cli_ext::infrastructure::traits::RealFileSystem;
use fabric_cli_ext::util::testing::{init_test_setup, MockHttpClient, MockTerminal};

const SIDETREE_URL: &str = "https://sidetree.test/sidetree/0.0.1/operations";
const CONTENT_URL: &str = "https://dcas.test/content";
const INDEX_URL: &str = "https://sidetree.test/sidetree/0.0.1/identifiers/file:idx:EiIdx";

const RECOVERY_PUB: &str = include_str!("fixtures/keys/recovery.pub.pem");
const UPDATE_PUB: &str = include_str!("fixtures/keys/update.pub.pem");

fn key_path(name: &str) -> String {
    format!("{}/tests/fixtures/keys/{}", env!("CARGO_MANIFEST_DIR"), name)
}

struct Fixture {
    http: Arc<MockHttpClient>,
    term: Arc<MockTerminal>,
    service: FileIndexService,
}

fn fixture(term: MockTerminal) -> Fixture {
    init_test_setup();
    let http = Arc::new(MockHttpClient::new());
    let term = Arc::new(term);
    let service = FileIndexService::new(http.clone(), Arc::new(RealFileSystem), term.clone());
    Fixture {
        http,
        term,
        service,
    }
}

fn decode_segment(segment: &Value) -> Value {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.as_str().expect("encoded segment"))
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================
// createidx
// ============================================================

fn create_options() -> CreateIndexOptions {
    CreateIndexOptions {
        url: SIDETREE_URL.into(),
        path: "/content".into(),
        auth_token: "tk".into(),
        recovery_key_file: key_path("recovery.pub.pem"),
        update_key: UPDATE_PUB.into(),
        no_prompt: true,
        ..Default::default()
    }
}

#[test]
fn given_valid_args_when_createidx_then_posts_create_request_and_prints_document() {
    // Arrange
    let f = fixture(MockTerminal::new());
    f.http.push_ok(
        r#"{"@context":"https://w3id.org/did-resolution/v1","didDocument":{"id":"did:sidetree:EiAbc","fileIndex":{"basePath":"/content"}}}"#,
    );

    // Act
    f.service.create_index(&create_options()).unwrap();

    // Assert - request
    let requests = f.http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, SIDETREE_URL);
    assert_eq!(requests[0].auth_token.as_deref(), Some("tk"));

    let body = requests[0].body_json();
    assert_eq!(body["type"], "create");
    let delta = decode_segment(&body["delta"]);
    assert_eq!(delta["patches"][0]["action"], "replace");
    assert_eq!(
        delta["patches"][0]["document"],
        json!({"id": "", "didUniqueSuffix": "", "fileIndex": {"basePath": "/content", "mappings": {".": "/content"}}})
    );
    let update_commitment =
        commitment(&Jwk::from_public_key(&public_key_from_pem(UPDATE_PUB).unwrap()).unwrap())
            .unwrap();
    assert_eq!(delta["update_commitment"], update_commitment);

    let suffix_data = decode_segment(&body["suffix_data"]);
    let recovery_commitment =
        commitment(&Jwk::from_public_key(&public_key_from_pem(RECOVERY_PUB).unwrap()).unwrap())
            .unwrap();
    assert_eq!(suffix_data["recovery_commitment"], recovery_commitment);

    // Assert - output is the unwrapped document, no trailing newline
    assert_eq!(
        f.term.output(),
        r#"{"id":"did:sidetree:EiAbc","fileIndex":{"basePath":"/content"}}"#
    );
}

#[test]
fn given_unwrapped_response_when_createidx_then_prints_payload_verbatim() {
    let f = fixture(MockTerminal::new());
    let doc = r#"{"id":"did:sidetree:EiAbc"}"#;
    f.http.push_ok(doc);

    f.service.create_index(&create_options()).unwrap();

    assert_eq!(f.term.output(), doc);
}

#[rstest]
#[case::unauthorized(
    401,
    "status code 401: invalid token - Did you provide an authorization token (--authtoken)?"
)]
#[case::server_error(500, "status code 500: invalid token")]
fn given_error_status_when_createidx_then_surfaces_status_and_body(
    #[case] status: u16,
    #[case] expected: &str,
) {
    let f = fixture(MockTerminal::new());
    f.http.push_status(status, "invalid token");

    let err = f.service.create_index(&create_options()).unwrap_err();

    assert_eq!(err.to_string(), expected);
    assert_eq!(f.term.output(), "");
}

#[test]
fn given_prompt_confirmed_when_createidx_then_shows_path_and_posts() {
    let f = fixture(MockTerminal::with_input("y\n"));
    f.http.push_ok(r#"{"id":"x"}"#);

    f.service
        .create_index(&CreateIndexOptions {
            no_prompt: false,
            ..create_options()
        })
        .unwrap();

    assert_eq!(f.http.requests().len(), 1);
    assert!(f.term.output().starts_with(&format!(
        "Creating file index document for path [/content]\n{MSG_CONTINUE_OR_ABORT}\n"
    )));
}

#[test]
fn given_prompt_refused_when_createidx_then_nothing_posted() {
    let f = fixture(MockTerminal::with_input("n\n"));

    f.service
        .create_index(&CreateIndexOptions {
            no_prompt: false,
            ..create_options()
        })
        .unwrap();

    assert!(f.http.requests().is_empty());
    assert!(f.term.output().ends_with(&format!("{MSG_ABORTED}\n")));
}

#[rstest]
#[case::no_url(CreateIndexOptions { url: String::new(), ..create_options() }, "URL (--url) is required")]
#[case::no_path(CreateIndexOptions { path: String::new(), ..create_options() }, "path (--path) is required")]
#[case::relative_path(
    CreateIndexOptions { path: "content".into(), ..create_options() },
    "path (--path) must begin with '/'"
)]
#[case::no_recovery_key(
    CreateIndexOptions { recovery_key_file: String::new(), ..create_options() },
    "either recovery key (--recoverykey) or key file (--recoverykeyfile) is required"
)]
#[case::both_recovery_keys(
    CreateIndexOptions { recovery_key: RECOVERY_PUB.into(), ..create_options() },
    "only one of recovery key (--recoverykey) or key file (--recoverykeyfile) may be specified"
)]
#[case::no_update_key(
    CreateIndexOptions { update_key: String::new(), ..create_options() },
    "either update key (--updatekey) or key file (--updatekeyfile) is required"
)]
#[case::both_update_keys(
    CreateIndexOptions { update_key_file: key_path("update.pub.pem"), ..create_options() },
    "only one of update key (--updatekey) or key file (--updatekeyfile) may be specified"
)]
fn given_bad_args_when_createidx_then_validation_error(
    #[case] opts: CreateIndexOptions,
    #[case] expected: &str,
) {
    let f = fixture(MockTerminal::new());

    let err = f.service.create_index(&opts).unwrap_err();

    assert_eq!(err.to_string(), expected);
    assert!(f.http.requests().is_empty());
}

#[test]
fn given_key_file_without_pem_when_createidx_then_public_key_not_found() {
    let temp = TempDir::new().unwrap();
    let key_file = temp.path().join("bad.pem");
    fs::write(&key_file, "not a key").unwrap();
    let f = fixture(MockTerminal::new());

    let err = f
        .service
        .create_index(&CreateIndexOptions {
            recovery_key_file: key_file.to_string_lossy().into_owned(),
            ..create_options()
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "public key not found in PEM");
    assert!(f.http.requests().is_empty());
}

#[test]
fn given_missing_key_file_when_createidx_then_read_error_names_path() {
    let f = fixture(MockTerminal::new());

    let err = f
        .service
        .create_index(&CreateIndexOptions {
            recovery_key_file: "/nonexistent/recovery.pem".into(),
            ..create_options()
        })
        .unwrap_err();

    assert!(
        err.to_string()
            .starts_with("read key file: /nonexistent/recovery.pem"),
        "{err}"
    );
}

// ============================================================
// upload
// ============================================================

struct UploadFiles {
    _temp: TempDir,
    json_file: PathBuf,
    html_file: PathBuf,
}

fn upload_files() -> UploadFiles {
    let temp = TempDir::new().unwrap();
    let json_file = temp.path().join("schema.json");
    let html_file = temp.path().join("index.html");
    fs::write(&json_file, r#"{"a":1}"#).unwrap();
    fs::write(&html_file, "<html></html>").unwrap();
    UploadFiles {
        _temp: temp,
        json_file,
        html_file,
    }
}

fn upload_options(files: &UploadFiles) -> UploadOptions {
    UploadOptions {
        url: CONTENT_URL.into(),
        files: format!("{};{}", files.json_file.display(), files.html_file.display()),
        index_url: INDEX_URL.into(),
        auth_token: "tk".into(),
        signing_key_file: key_path("signing.pem"),
        next_update_key_file: key_path("next.pub.pem"),
        no_prompt: true,
        ..Default::default()
    }
}

fn index_document(base_path: &str) -> String {
    json!({
        "didDocument": {
            "id": "file:idx:EiIdx",
            "fileIndex": {"basePath": base_path, "mappings": {"schema.json": "oldHash"}}
        }
    })
    .to_string()
}

#[test]
fn given_two_files_when_upload_then_uploads_each_and_patches_index() {
    // Arrange
    let files = upload_files();
    let f = fixture(MockTerminal::new());
    f.http.push_ok(&index_document("/content"));
    f.http.push_ok(r#""hashJson""#);
    f.http.push_ok(r#""hashHtml""#);
    f.http.push_ok("{}");

    // Act
    f.service.upload(&upload_options(&files)).unwrap();

    // Assert - index lookup
    let requests = f.http.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, INDEX_URL);
    assert_eq!(requests[0].auth_token.as_deref(), Some("tk"));

    // Assert - content uploads use the auth token when no content token is given
    assert_eq!(requests[1].url, CONTENT_URL);
    assert_eq!(requests[1].auth_token.as_deref(), Some("tk"));
    let upload = requests[1].body_json();
    assert_eq!(upload["contentType"], "application/json");
    assert_eq!(upload["content"], STANDARD.encode(r#"{"a":1}"#));
    assert_eq!(requests[2].body_json()["contentType"], "text/html");

    // Assert - index update
    assert_eq!(
        requests[3].url,
        "https://sidetree.test/sidetree/0.0.1/operations"
    );
    let update = requests[3].body_json();
    assert_eq!(update["type"], "update");
    assert_eq!(update["did_suffix"], "EiIdx");
    let delta = decode_segment(&update["delta"]);
    assert_eq!(
        delta["patches"][0]["patches"],
        json!([
            {"op": "replace", "path": "/fileIndex/mappings/schema.json", "value": "hashJson"},
            {"op": "add", "path": "/fileIndex/mappings/index.html", "value": "hashHtml"}
        ])
    );

    // Assert - output lists uploaded files
    assert_eq!(
        f.term.output(),
        r#"[{"Name":"schema.json","ID":"hashJson","ContentType":"application/json"},{"Name":"index.html","ID":"hashHtml","ContentType":"text/html"}]"#
    );
}

#[test]
fn given_content_token_when_upload_then_used_only_for_content_endpoint() {
    let files = upload_files();
    let f = fixture(MockTerminal::new());
    f.http.push_ok(&index_document("/content"));
    f.http.push_ok(r#""h1""#);
    f.http.push_ok("{}");

    f.service
        .upload(&UploadOptions {
            files: files.json_file.display().to_string(),
            content_auth_token: "ctk".into(),
            ..upload_options(&files)
        })
        .unwrap();

    let tokens: Vec<_> = f
        .http
        .requests()
        .into_iter()
        .map(|r| r.auth_token)
        .collect();
    assert_eq!(
        tokens,
        vec![Some("tk".into()), Some("ctk".into()), Some("tk".into())]
    );
}

#[rstest]
#[case::not_found(404, format!("file index document [{INDEX_URL}] not found"))]
#[case::unauthorized(
    401,
    format!("error retrieving file index document [{INDEX_URL}]. Status code 401: denied - Did you provide an authorization token (--authtoken)?")
)]
#[case::server_error(
    500,
    format!("error retrieving file index document [{INDEX_URL}] status code 500: denied")
)]
fn given_index_lookup_fails_when_upload_then_nothing_uploaded(
    #[case] status: u16,
    #[case] expected: String,
) {
    let files = upload_files();
    let f = fixture(MockTerminal::new());
    f.http.push_status(status, "denied");

    let err = f.service.upload(&upload_options(&files)).unwrap_err();

    assert_eq!(err.to_string(), expected);
    assert_eq!(f.http.requests().len(), 1);
}

#[test]
fn given_index_for_other_base_path_when_upload_then_mismatch_error() {
    let files = upload_files();
    let f = fixture(MockTerminal::new());
    f.http.push_ok(&index_document("/other"));

    let err = f.service.upload(&upload_options(&files)).unwrap_err();

    assert_eq!(
        err.to_string(),
        "base path of file index doc does not match the base path of the file: [/other] != [/content]"
    );
    assert_eq!(f.http.requests().len(), 1);
}

#[test]
fn given_content_upload_unauthorized_when_upload_then_hints_content_token() {
    let files = upload_files();
    let f = fixture(MockTerminal::new());
    f.http.push_ok(&index_document("/content"));
    f.http.push_status(401, "denied");

    let err = f.service.upload(&upload_options(&files)).unwrap_err();

    assert_eq!(
        err.to_string(),
        "status code 401: denied - Did you provide an authorization token (--contentauthtoken)?"
    );
    assert_eq!(f.http.requests().len(), 2);
}

#[rstest]
#[case::unauthorized(
    401,
    "error updating file index document. Status code 401: denied - Did you provide an authorization token (--authtoken)?"
)]
#[case::bad_request(400, "error updating file index document. Status code 400: denied")]
fn given_index_update_fails_when_upload_then_reports_update_error(
    #[case] status: u16,
    #[case] expected: &str,
) {
    let files = upload_files();
    let f = fixture(MockTerminal::new());
    f.http.push_ok(&index_document("/content"));
    f.http.push_ok(r#""h1""#);
    f.http.push_ok(r#""h2""#);
    f.http.push_status(status, "denied");

    let err = f.service.upload(&upload_options(&files)).unwrap_err();

    assert_eq!(err.to_string(), expected);
    assert_eq!(f.term.output(), "");
}

#[test]
fn given_file_without_extension_when_upload_then_content_type_error() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("README");
    fs::write(&file, "text").unwrap();
    let files = upload_files();
    let f = fixture(MockTerminal::new());
    f.http.push_ok(&index_document("/content"));

    let err = f
        .service
        .upload(&UploadOptions {
            files: file.display().to_string(),
            ..upload_options(&files)
        })
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "content type cannot be deduced since no file extension provided"
    );
    assert_eq!(f.http.requests().len(), 1);
}

#[test]
fn given_prompt_refused_when_upload_then_lists_files_and_uploads_nothing() {
    let files = upload_files();
    let f = fixture(MockTerminal::with_input("n\n"));
    f.http.push_ok(&index_document("/content"));

    f.service
        .upload(&UploadOptions {
            no_prompt: false,
            ..upload_options(&files)
        })
        .unwrap();

    assert_eq!(f.http.requests().len(), 1);
    let output = f.term.output();
    assert!(output.starts_with(&format!(
        "Uploading the following files to [{CONTENT_URL}]\n[{{\"Name\":\"schema.json\",\"ContentType\":\"application/json\"}}"
    )));
    assert!(output.ends_with(&format!("{MSG_ABORTED}\n")));
}

#[rstest]
#[case::no_url(UploadOptions { url: String::new(), ..Default::default() }, "URL (--url) is required")]
#[case::no_base_path(
    UploadOptions { url: "https://dcas.test".into(), ..Default::default() },
    "invalid URL - no base path found"
)]
#[case::no_index_url(
    UploadOptions { url: CONTENT_URL.into(), ..Default::default() },
    "file index URL (--idxurl) is required"
)]
#[case::index_url_without_identifiers(
    UploadOptions { url: CONTENT_URL.into(), index_url: "https://sidetree.test/file:idx:1".into(), ..Default::default() },
    "invalid file index URL: [https://sidetree.test/file:idx:1] - the file index ID must be prefixed by identifiers/"
)]
#[case::no_files(
    UploadOptions { url: CONTENT_URL.into(), index_url: INDEX_URL.into(), ..Default::default() },
    "files (--files) is required"
)]
#[case::no_signing_key(
    UploadOptions { url: CONTENT_URL.into(), index_url: INDEX_URL.into(), files: "a.json".into(), ..Default::default() },
    "either signing key (--signingkey) or key file (--signingkeyfile) is required"
)]
#[case::no_next_update_key(
    UploadOptions { url: CONTENT_URL.into(), index_url: INDEX_URL.into(), files: "a.json".into(), signing_key: "pem".into(), ..Default::default() },
    "either next update key (--nextupdatekey) or key file (--nextupdatekeyfile) is required"
)]
fn given_bad_args_when_upload_then_validation_error(
    #[case] opts: UploadOptions,
    #[case] expected: &str,
) {
    let f = fixture(MockTerminal::new());

    let err = f.service.upload(&opts).unwrap_err();

    assert_eq!(err.to_string(), expected);
    assert!(f.http.requests().is_empty());
}
