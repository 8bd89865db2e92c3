use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CommitRequest, PublishError, Publisher, RemoteArtifact};
use crate::config::GithubConfig;

const USER_AGENT: &str = concat!("romwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateFileBody<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
    author: AuthorBody<'a>,
}

#[derive(Debug, Serialize)]
struct AuthorBody<'a> {
    name: &'a str,
    email: &'a str,
    date: String,
}

#[derive(Debug, Deserialize)]
struct UpdateFileResponse {
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

/// Publishes the deploy script through the GitHub REST API.
///
/// `Debug` output never includes the token.
#[derive(Debug)]
pub struct GithubPublisher {
    client: reqwest::Client,
    api_base_url: String,
    owner: String,
    repo: String,
    token: SecretString,
    timeout: Duration,
}

impl GithubPublisher {
    pub fn new(
        config: &GithubConfig,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(PublishError::Client)?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token,
            timeout,
        })
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base_url, self.owner, self.repo, tail
        )
    }

    /// Authenticates and sends `request`, turning non-2xx responses into errors.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PublishError> {
        let request = request
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| PublishError::Timeout)?
            .map_err(|e| {
                if e.is_timeout() {
                    PublishError::Timeout
                } else {
                    PublishError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(PublishError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Publisher for GithubPublisher {
    async fn get_artifact(&self, path: &str, branch: &str) -> Result<RemoteArtifact, PublishError> {
        let mut url = url::Url::parse(&self.repo_url(&format!("contents/{path}")))?;
        url.query_pairs_mut().append_pair("ref", branch);

        tracing::debug!(url = %url, "Fetching artifact");
        let response = self.send(self.client.get(url)).await?;
        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;

        if let Some(encoding) = contents.encoding.as_deref() {
            if encoding != "base64" {
                return Err(PublishError::InvalidResponse(format!(
                    "unsupported content encoding `{encoding}`"
                )));
            }
        }

        Ok(RemoteArtifact {
            content: decode_content(&contents.content)?,
            sha: contents.sha,
        })
    }

    async fn commit_artifact(&self, request: &CommitRequest<'_>) -> Result<String, PublishError> {
        let body = UpdateFileBody {
            message: request.message,
            content: STANDARD.encode(request.content),
            sha: request.base_sha,
            branch: request.branch,
            author: AuthorBody {
                name: &request.author.name,
                email: &request.author.email,
                date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        };

        let url = self.repo_url(&format!("contents/{}", request.path));
        let response = self.send(self.client.put(url).json(&body)).await?;
        let updated: UpdateFileResponse = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;

        tracing::debug!(sha = %updated.commit.sha, "Committed artifact");
        Ok(updated.commit.sha)
    }

    async fn create_tag(&self, name: &str, sha: &str) -> Result<(), PublishError> {
        let body = CreateRefBody {
            reference: format!("refs/tags/{name}"),
            sha,
        };

        self.send(self.client.post(self.repo_url("git/refs")).json(&body))
            .await?;
        tracing::debug!(tag = %name, sha = %sha, "Created tag");
        Ok(())
    }
}

/// The contents API wraps base64 at 60 columns; strip whitespace before decoding.
fn decode_content(encoded: &str) -> Result<String, PublishError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| PublishError::InvalidResponse(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| PublishError::InvalidResponse(format!("content is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::CommitAuthor;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const SCRIPT: &str = "#!/bin/bash\nEU_VER=8.2.22\n";

    fn publisher(server: &MockServer) -> GithubPublisher {
        let config = GithubConfig {
            owner: "owner".to_string(),
            repo: "repo".to_string(),
            api_base_url: format!("{}/", server.uri()),
            ..GithubConfig::default()
        };
        GithubPublisher::new(
            &config,
            SecretString::from("t0ken".to_string()),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    fn wrapped_base64(text: &str) -> String {
        let encoded = STANDARD.encode(text);
        encoded
            .as_bytes()
            .chunks(8)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_get_artifact_decodes_wrapped_base64() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/repo/contents/deploy.sh"))
            .and(query_param("ref", "master"))
            .and(header("Authorization", "Bearer t0ken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "file",
                "encoding": "base64",
                "content": wrapped_base64(SCRIPT),
                "sha": "blob123",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let artifact = publisher(&server)
            .get_artifact("deploy.sh", "master")
            .await
            .unwrap();
        assert_eq!(artifact.content, SCRIPT);
        assert_eq!(artifact.sha, "blob123");
    }

    #[tokio::test]
    async fn test_get_artifact_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"message\":\"Not Found\"}"))
            .mount(&server)
            .await;

        match publisher(&server).get_artifact("deploy.sh", "master").await {
            Err(PublishError::Api { status: 404, body }) => assert!(body.contains("Not Found")),
            other => panic!("Expected Api 404, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_artifact_rejects_unknown_encoding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "encoding": "none",
                "content": "",
                "sha": "blob123",
            })))
            .mount(&server)
            .await;

        let result = publisher(&server).get_artifact("deploy.sh", "master").await;
        assert!(matches!(result, Err(PublishError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_commit_artifact_sends_base_sha_and_author() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/owner/repo/contents/deploy.sh"))
            .and(body_partial_json(serde_json::json!({
                "message": "Update to 8.3.1",
                "content": STANDARD.encode(SCRIPT),
                "sha": "blob123",
                "branch": "master",
                "author": { "name": "bot", "email": "bot@example.com" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": { "sha": "blob456" },
                "commit": { "sha": "commit789" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let author = CommitAuthor {
            name: "bot".to_string(),
            email: "bot@example.com".to_string(),
        };
        let sha = publisher(&server)
            .commit_artifact(&CommitRequest {
                path: "deploy.sh",
                branch: "master",
                content: SCRIPT,
                base_sha: "blob123",
                message: "Update to 8.3.1",
                author: &author,
            })
            .await
            .unwrap();
        assert_eq!(sha, "commit789");

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let date = body["author"]["date"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(date).is_ok());
    }

    #[tokio::test]
    async fn test_commit_conflict_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409).set_body_string("sha mismatch"))
            .mount(&server)
            .await;

        let author = CommitAuthor {
            name: "bot".to_string(),
            email: "bot@example.com".to_string(),
        };
        let result = publisher(&server)
            .commit_artifact(&CommitRequest {
                path: "deploy.sh",
                branch: "master",
                content: SCRIPT,
                base_sha: "stale",
                message: "Update to 8.3.1",
                author: &author,
            })
            .await;
        assert!(matches!(result, Err(PublishError::Api { status: 409, .. })));
    }

    #[tokio::test]
    async fn test_create_tag_posts_ref() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/repo/git/refs"))
            .and(body_partial_json(serde_json::json!({
                "ref": "refs/tags/8.3.1",
                "sha": "commit789",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "ref": "refs/tags/8.3.1",
            })))
            .expect(1)
            .mount(&server)
            .await;

        publisher(&server)
            .create_tag("8.3.1", "commit789")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_debug_masks_token() {
        let server = MockServer::start().await;
        let debug_output = format!("{:?}", publisher(&server));
        assert!(!debug_output.contains("t0ken"));
    }

    #[test]
    fn test_decode_content_rejects_garbage() {
        assert!(decode_content("!!!").is_err());
        assert_eq!(decode_content(" aGk=\n").unwrap(), "hi");
    }
}
