//! File index service
//!
//! Creates Sidetree file index documents and uploads files to a content
//! endpoint, recording each file's content ID in the index.

use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::{PublicKey, SecretKey};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::application::confirm::confirm;
use crate::application::error_ext::JsonResultExt;
use crate::application::sidetree;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{DidResolution, DomainError, DomainResult, FileIndexDoc, FileInfo, JsonPatchOp};
use crate::infrastructure::traits::{FileSystem, HttpClient, HttpResponse, RequestOptions, Terminal};
use crate::util::path::{expand_env_vars, last_segment};

const AUTH_TOKEN_HINT: &str = " - Did you provide an authorization token (--authtoken)?";
const CONTENT_AUTH_TOKEN_HINT: &str =
    " - Did you provide an authorization token (--contentauthtoken)?";

const IDENTIFIERS_PATH: &str = "/identifiers";
const MAPPINGS_PATH: &str = "/fileIndex/mappings/";

/// Exactly one of an inline PEM and a PEM file must be given.
fn require_one_of(inline: &str, file: &str, key: &str, flag: &str) -> DomainResult<()> {
    match (inline.is_empty(), file.is_empty()) {
        (true, true) => Err(DomainError::validation(format!(
            "either {key} (--{flag}) or key file (--{flag}file) is required"
        ))),
        (false, false) => Err(DomainError::validation(format!(
            "only one of {key} (--{flag}) or key file (--{flag}file) may be specified"
        ))),
        _ => Ok(()),
    }
}

fn status_error(resp: &HttpResponse, hint: &str) -> ApplicationError {
    ApplicationError::HttpStatus {
        status: resp.status,
        body: resp.error_msg.clone(),
        hint: if resp.status == 401 {
            hint.to_string()
        } else {
            String::new()
        },
    }
}

/// Return the document inside a DID resolution envelope, or the payload unchanged.
fn unwrap_did_document(payload: &[u8]) -> ApplicationResult<Vec<u8>> {
    let resolution: DidResolution =
        serde_json::from_slice(payload).json_context("unmarshal data returned from Sidetree")?;
    match resolution.did_document {
        Some(doc) if !doc.is_null() => {
            serde_json::to_vec(&doc).json_context("encode DID document")
        }
        _ => Ok(payload.to_vec()),
    }
}

/// Arguments of `file createidx`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateIndexOptions {
    /// Sidetree operations endpoint
    pub url: String,
    /// Base path the index covers, e.g. `/content`
    pub path: String,
    pub auth_token: String,
    pub recovery_key: String,
    pub recovery_key_file: String,
    pub update_key: String,
    pub update_key_file: String,
    pub no_prompt: bool,
}

impl CreateIndexOptions {
    pub fn validate(&self) -> DomainResult<()> {
        if self.url.is_empty() {
            return Err(DomainError::validation("URL (--url) is required"));
        }
        if self.path.is_empty() {
            return Err(DomainError::validation("path (--path) is required"));
        }
        if !self.path.starts_with('/') {
            return Err(DomainError::validation("path (--path) must begin with '/'"));
        }
        require_one_of(
            &self.recovery_key,
            &self.recovery_key_file,
            "recovery key",
            "recoverykey",
        )?;
        require_one_of(
            &self.update_key,
            &self.update_key_file,
            "update key",
            "updatekey",
        )
    }
}

/// Arguments of `file upload`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Content endpoint; its path is the base path of the file index
    pub url: String,
    /// Semicolon-separated file paths
    pub files: String,
    /// URL of the file index document, `.../identifiers/<id>`
    pub index_url: String,
    pub auth_token: String,
    /// Token for the content endpoint; `auth_token` when empty
    pub content_auth_token: String,
    pub signing_key: String,
    pub signing_key_file: String,
    pub next_update_key: String,
    pub next_update_key_file: String,
    pub no_prompt: bool,
}

/// Values derived from validated upload arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub base_path: String,
    /// Sidetree operations URL for index updates
    pub update_url: String,
    pub content_auth_token: String,
}

impl UploadOptions {
    pub fn validate(&self) -> DomainResult<UploadTarget> {
        if self.url.is_empty() {
            return Err(DomainError::validation("URL (--url) is required"));
        }
        let url = Url::parse(&self.url).map_err(|e| {
            DomainError::validation(format!("invalid URL [{}]: {}", self.url, e))
        })?;
        let base_path = url.path();
        if base_path.is_empty() || base_path == "/" {
            return Err(DomainError::validation("invalid URL - no base path found"));
        }

        if self.index_url.is_empty() {
            return Err(DomainError::validation("file index URL (--idxurl) is required"));
        }
        let Some(pos) = self.index_url.rfind(IDENTIFIERS_PATH) else {
            return Err(DomainError::validation(format!(
                "invalid file index URL: [{}] - the file index ID must be prefixed by identifiers/",
                self.index_url
            )));
        };

        if self.files.is_empty() {
            return Err(DomainError::validation("files (--files) is required"));
        }
        require_one_of(
            &self.signing_key,
            &self.signing_key_file,
            "signing key",
            "signingkey",
        )?;
        require_one_of(
            &self.next_update_key,
            &self.next_update_key_file,
            "next update key",
            "nextupdatekey",
        )?;

        Ok(UploadTarget {
            base_path: base_path.to_string(),
            update_url: format!("{}/operations", &self.index_url[..pos]),
            content_auth_token: if self.content_auth_token.is_empty() {
                self.auth_token.clone()
            } else {
                self.content_auth_token.clone()
            },
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadFile<'a> {
    content_type: &'a str,
    content: String,
}

/// Service for the `file` commands.
pub struct FileIndexService {
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystem>,
    term: Arc<dyn Terminal>,
}

impl FileIndexService {
    pub fn new(
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystem>,
        term: Arc<dyn Terminal>,
    ) -> Self {
        Self { http, fs, term }
    }

    fn write(&self, text: &str) -> ApplicationResult<()> {
        self.term
            .print(text)
            .map_err(|e| ApplicationError::operation("write output", e))
    }

    /// PEM text from the inline value or, when given, the key file.
    fn read_pem(&self, inline: &str, file: &str) -> ApplicationResult<String> {
        if file.is_empty() {
            return Ok(inline.to_string());
        }
        let path = expand_env_vars(file);
        self.fs
            .read_to_string(Path::new(&path))
            .with_path_context("read key file", Path::new(&path))
    }

    fn public_key(&self, inline: &str, file: &str) -> ApplicationResult<PublicKey> {
        sidetree::public_key_from_pem(&self.read_pem(inline, file)?)
    }

    fn private_key(&self, inline: &str, file: &str) -> ApplicationResult<SecretKey> {
        sidetree::private_key_from_pem(&self.read_pem(inline, file)?)
    }

    /// Create a file index document for `opts.path` and print the resulting document.
    pub fn create_index(&self, opts: &CreateIndexOptions) -> ApplicationResult<()> {
        opts.validate()?;

        let doc = serde_json::to_value(FileIndexDoc::new_for_path(&opts.path))
            .json_context("encode file index document")?;
        let recovery_key = self.public_key(&opts.recovery_key, &opts.recovery_key_file)?;
        let update_key = self.public_key(&opts.update_key, &opts.update_key_file)?;
        let request = sidetree::create_request(&doc, &recovery_key, &update_key)?;

        if !opts.no_prompt {
            let message = format!("Creating file index document for path [{}]\n", opts.path);
            if !confirm(self.term.as_ref(), &message)? {
                return Ok(());
            }
        }

        debug!("posting create request to {}", opts.url);
        let resp = self.http.post(
            &opts.url,
            &request,
            &RequestOptions::with_auth_token(&opts.auth_token),
        )?;
        if !resp.is_ok() {
            return Err(status_error(&resp, AUTH_TOKEN_HINT));
        }

        let document = unwrap_did_document(&resp.payload)?;
        self.write(&String::from_utf8_lossy(&document))
    }

    /// Upload files and record their content IDs in the file index document.
    pub fn upload(&self, opts: &UploadOptions) -> ApplicationResult<()> {
        let target = opts.validate()?;

        let signing_key = self.private_key(&opts.signing_key, &opts.signing_key_file)?;
        let next_update_key = self.public_key(&opts.next_update_key, &opts.next_update_key_file)?;

        let index = self.get_file_index(opts, &target)?;
        let mut files = self.read_files(&opts.files)?;

        if !opts.no_prompt {
            let message = format!(
                "Uploading the following files to [{}]\n{}\n",
                opts.url,
                serde_json::to_string(&files).json_context("encode file list")?
            );
            if !confirm(self.term.as_ref(), &message)? {
                return Ok(());
            }
        }

        let content_opts = RequestOptions::with_auth_token(&target.content_auth_token);
        for file in files.iter_mut() {
            file.id = self.upload_file(&opts.url, file, &content_opts)?;
            info!("uploaded {} as {}", file.name, file.id);
        }

        let patches: Vec<JsonPatchOp> = files
            .iter()
            .map(|f| JsonPatchOp {
                op: if index.file_index.mappings.contains_key(&f.name) {
                    "replace"
                } else {
                    "add"
                }
                .to_string(),
                path: format!("{MAPPINGS_PATH}{}", f.name),
                value: f.id.clone(),
            })
            .collect();

        let suffix = unique_suffix(&opts.index_url)?;
        let request = sidetree::update_request(suffix, &patches, &signing_key, &next_update_key)?;

        let resp = self.http.post(
            &target.update_url,
            &request,
            &RequestOptions::with_auth_token(&opts.auth_token),
        )?;
        if !resp.is_ok() {
            let hint = if resp.status == 401 { AUTH_TOKEN_HINT } else { "" };
            return Err(ApplicationError::precondition(format!(
                "error updating file index document. Status code {}: {}{}",
                resp.status, resp.error_msg, hint
            )));
        }

        self.write(&serde_json::to_string(&files).json_context("encode file list")?)
    }

    fn get_file_index(
        &self,
        opts: &UploadOptions,
        target: &UploadTarget,
    ) -> ApplicationResult<FileIndexDoc> {
        let resp = self.http.get(
            &opts.index_url,
            &RequestOptions::with_auth_token(&opts.auth_token),
        )?;

        match resp.status {
            200 => {}
            404 => {
                return Err(ApplicationError::precondition(format!(
                    "file index document [{}] not found",
                    opts.index_url
                )))
            }
            401 => {
                return Err(ApplicationError::precondition(format!(
                    "error retrieving file index document [{}]. Status code {}: {}{}",
                    opts.index_url, resp.status, resp.error_msg, AUTH_TOKEN_HINT
                )))
            }
            status => {
                return Err(ApplicationError::precondition(format!(
                    "error retrieving file index document [{}] status code {}: {}",
                    opts.index_url, status, resp.error_msg
                )))
            }
        }

        let document = unwrap_did_document(&resp.payload)?;
        let index: FileIndexDoc =
            serde_json::from_slice(&document).json_context("decode file index document")?;

        if index.file_index.base_path != target.base_path {
            return Err(ApplicationError::precondition(format!(
                "base path of file index doc does not match the base path of the file: [{}] != [{}]",
                index.file_index.base_path, target.base_path
            )));
        }
        Ok(index)
    }

    fn read_files(&self, files: &str) -> ApplicationResult<Vec<FileInfo>> {
        files
            .split(';')
            .map(|file| {
                let name = last_segment(file);
                let content_type = content_type_for(name)?;
                let path = Path::new(file);
                let content = self.fs.read(path).with_path_context("read file", path)?;
                Ok(FileInfo {
                    name: name.to_string(),
                    id: String::new(),
                    content_type,
                    content,
                })
            })
            .collect()
    }

    fn upload_file(
        &self,
        url: &str,
        file: &FileInfo,
        opts: &RequestOptions,
    ) -> ApplicationResult<String> {
        let body = serde_json::to_vec(&UploadFile {
            content_type: &file.content_type,
            content: STANDARD.encode(&file.content),
        })
        .json_context("encode upload request")?;

        let resp = self.http.post(url, &body, opts)?;
        if !resp.is_ok() {
            return Err(status_error(&resp, CONTENT_AUTH_TOKEN_HINT));
        }
        serde_json::from_slice(&resp.payload).json_context("decode content ID")
    }
}

/// Content type from the file extension.
fn content_type_for(file_name: &str) -> DomainResult<String> {
    let Some(pos) = file_name.rfind('.') else {
        return Err(DomainError::validation(
            "content type cannot be deduced since no file extension provided",
        ));
    };
    mime_guess::from_ext(&file_name[pos + 1..])
        .first()
        .map(|mime| mime.essence_str().to_string())
        .ok_or_else(|| DomainError::validation("content type cannot be deduced from extension"))
}

/// DID unique suffix: the text after the last `:` of the index URL.
fn unique_suffix(index_url: &str) -> ApplicationResult<&str> {
    index_url
        .rfind(':')
        .map(|pos| &index_url[pos + 1..])
        .ok_or_else(|| {
            ApplicationError::precondition(format!(
                "unique suffix not provided in URL [{index_url}]"
            ))
        })
}
