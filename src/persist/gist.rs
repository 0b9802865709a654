// src/persist/gist.rs
// =============================================================================
// This module stores the note in a private GitHub Gist.
//
// Strategy:
// - The note lives in a gist that contains a file named "link-notes.md"
// - To find it, list the user's gists and look for that file name,
//   following the Link header's rel="next" page until it turns up
// - Save = update that gist if it exists, otherwise create it
//
// All requests carry the user's token as a bearer token, so "the owner" is
// simply whoever the token belongs to.
//
// Rust concepts:
// - serde derive: the Gist API's JSON mapped onto small structs
// - Borrowed fields in Serialize structs: no copying of the note text
// =============================================================================

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::store::{Credential, DocumentId, DocumentStore, StoreError};
use crate::config::StoreConfig;

pub const NOTE_FILENAME: &str = "link-notes.md";
const NOTE_DESCRIPTION: &str = "link-notes - note storage";
const GITHUB_JSON: &str = "application/vnd.github+json";

// One entry of GET /gists (we only need the id and the file names)
#[derive(Debug, Deserialize)]
struct GistSummary {
    id: String,
    #[serde(default)]
    files: HashMap<String, serde_json::Value>,
}

// GET /gists/{id}
#[derive(Debug, Deserialize)]
struct Gist {
    id: String,
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
}

// Body of POST /gists and PATCH /gists/{id}
#[derive(Debug, Serialize)]
struct GistWrite<'a> {
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    public: Option<bool>,
    files: HashMap<&'a str, FileContent<'a>>,
}

#[derive(Debug, Serialize)]
struct FileContent<'a> {
    content: &'a str,
}

impl<'a> GistWrite<'a> {
    fn note(content: &'a str, public: Option<bool>) -> Self {
        Self {
            description: NOTE_DESCRIPTION,
            public,
            files: HashMap::from([(NOTE_FILENAME, FileContent { content })]),
        }
    }
}

/// GitHub Gist backed note storage
#[derive(Debug, Clone)]
pub struct GistStore {
    client: Client,
    api_base: String,
}

impl GistStore {
    pub fn new(config: &StoreConfig) -> anyhow::Result<Self> {
        // GitHub rejects API requests without a User-Agent
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    fn request(&self, method: Method, path: &str, credential: &Credential) -> RequestBuilder {
        self.request_url(method, &format!("{}{}", self.api_base, path), credential)
    }

    // Page links from GitHub are absolute, so they skip the api_base prefix
    fn request_url(&self, method: Method, url: &str, credential: &Credential) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(credential.secret())
            .header(ACCEPT, GITHUB_JSON)
    }

    // Walks the gist list page by page, stopping at the first page that
    // holds the note
    async fn find_note(&self, credential: &Credential) -> Result<Option<DocumentId>, StoreError> {
        let mut page = format!("{}/gists?per_page=100", self.api_base);
        let mut pages = 0;

        loop {
            let request = self.request_url(Method::GET, &page, credential);
            let response = check_status(request.send().await?).await?;
            let next = next_page(response.headers());
            let gists: Vec<GistSummary> = decode_json(response).await?;
            pages += 1;

            if let Some(id) = find_note_id(&gists) {
                tracing::debug!(gist = %id, pages, "found note gist");
                return Ok(Some(id));
            }
            match next {
                Some(url) => page = url,
                None => return Ok(None),
            }
        }
    }

    async fn read_note(&self, credential: &Credential, id: &DocumentId) -> Result<String, StoreError> {
        let gist: Gist =
            send_json(self.request(Method::GET, &format!("/gists/{}", id), credential)).await?;
        Ok(note_content(gist))
    }

    async fn create_note(&self, credential: &Credential, content: &str) -> Result<DocumentId, StoreError> {
        let request = self
            .request(Method::POST, "/gists", credential)
            .json(&GistWrite::note(content, Some(false)));
        let gist: Gist = send_json(request).await?;
        tracing::info!(gist = %gist.id, "created note gist");
        Ok(DocumentId(gist.id))
    }

    async fn update_note(
        &self,
        credential: &Credential,
        id: &DocumentId,
        content: &str,
    ) -> Result<(), StoreError> {
        let request = self
            .request(Method::PATCH, &format!("/gists/{}", id), credential)
            .json(&GistWrite::note(content, None));
        let _: Gist = send_json(request).await?;
        Ok(())
    }
}

impl DocumentStore for GistStore {
    fn find<'a>(&'a self, credential: &'a Credential)
        -> BoxFuture<'a, Result<Option<DocumentId>, StoreError>> {
        Box::pin(self.find_note(credential))
    }

    fn read<'a>(
        &'a self,
        credential: &'a Credential,
        id: &'a DocumentId,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        Box::pin(self.read_note(credential, id))
    }

    fn create<'a>(
        &'a self,
        credential: &'a Credential,
        content: &'a str,
    ) -> BoxFuture<'a, Result<DocumentId, StoreError>> {
        Box::pin(self.create_note(credential, content))
    }

    fn update<'a>(
        &'a self,
        credential: &'a Credential,
        id: &'a DocumentId,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.update_note(credential, id, content))
    }
}

// Sends a request and decodes the JSON body
//
// Non-2xx responses become StoreError::Status with the body kept for logs
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, StoreError> {
    let response = check_status(request.send().await?).await?;
    decode_json(response).await
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed(e.to_string()))
}

// Extracts the rel="next" target from a Link header such as
// <https://api.github.com/gists?page=2>; rel="next", <...>; rel="last"
fn next_page(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;

    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params.split(';').any(|param| param.trim() == r#"rel="next""#);
        is_next.then(|| target.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    })
}

fn find_note_id(gists: &[GistSummary]) -> Option<DocumentId> {
    gists
        .iter()
        .find(|gist| gist.files.contains_key(NOTE_FILENAME))
        .map(|gist| DocumentId(gist.id.clone()))
}

// A gist without our file (or with a truncated file) reads as an empty note
fn note_content(gist: Gist) -> String {
    gist.files
        .get(NOTE_FILENAME)
        .and_then(|file| file.content.clone())
        .unwrap_or_default()
}
