//! Turning a user-facing share link into a manifest URL and a file name.

use std::{future::Future, sync::LazyLock};

use regex::Regex;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{util::http::HttpClient, util::sanitize_file_stem, KasaneError, KasaneResult};

pub const DEFAULT_API_BASE: &str = "https://www.loom.com";

static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:share|embed)/([a-f0-9]{32})").unwrap());

const GET_VIDEO_QUERY: &str = r#"
query GetVideoSSR($videoId: ID!, $password: String) {
  getVideo(id: $videoId, password: $password) {
    __typename
    ... on PrivateVideo {
      id
      status
      message
      __typename
    }
    ... on VideoPasswordMissingOrIncorrect {
      id
      message
      __typename
    }
    ... on RegularUserVideo {
      id
      __typename
      name
      description
      download_enabled
      is_protected
      needs_password
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub video_id: String,
    pub is_embed: bool,
}

impl ShareLink {
    /// Accepts `.../share/<id>` and `.../embed/<id>` where `<id>` is 32 lowercase hex digits.
    pub fn parse(link: &str) -> KasaneResult<Self> {
        let video_id = VIDEO_ID_REGEX
            .captures(link)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| KasaneError::InvalidShareUrl(link.to_string()))?;

        Ok(Self {
            video_id,
            is_embed: link.contains("/embed/"),
        })
    }
}

/// Where to download from, and what to call the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub manifest_url: Url,
    pub title: Option<String>,
}

impl ResolvedAsset {
    /// `<sanitized title>.mp4`, or the last path segment of the URL without a title.
    pub fn file_name(&self) -> String {
        if let Some(title) = &self.title {
            return file_name_from_title(title);
        }

        self.manifest_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|name| name.rsplit_once('.').map(|(stem, _)| stem))
            .filter(|stem| !stem.is_empty())
            .map(|stem| format!("{}.mp4", sanitize_file_stem(stem)))
            .unwrap_or_else(|| "video.mp4".to_string())
    }
}

pub fn file_name_from_title(title: &str) -> String {
    format!("{}.mp4", sanitize_file_stem(title))
}

pub trait ManifestUrlResolver: Send + Sync {
    fn resolve_manifest_url(
        &self,
        target: &str,
        password: Option<&str>,
    ) -> impl Future<Output = KasaneResult<ResolvedAsset>> + Send;
}

/// The target already is the manifest (or file) URL.
pub struct DirectUrl;

impl ManifestUrlResolver for DirectUrl {
    async fn resolve_manifest_url(
        &self,
        target: &str,
        _password: Option<&str>,
    ) -> KasaneResult<ResolvedAsset> {
        Ok(ResolvedAsset {
            manifest_url: Url::parse(target)?,
            title: None,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlOperation<'a> {
    operation_name: &'static str,
    variables: GraphqlVariables<'a>,
    query: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlVariables<'a> {
    video_id: &'a str,
    password: Option<&'a str>,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<GraphqlData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlData {
    get_video: Option<VideoMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct VideoMetadata {
    #[serde(rename = "__typename")]
    pub typename: String,
    pub name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UrlRequest<'a> {
    #[serde(rename = "anonID")]
    anon_id: String,
    #[serde(rename = "deviceID")]
    device_id: Option<&'a str>,
    #[serde(rename = "force_original")]
    force_original: bool,
    password: Option<&'a str>,
}

#[derive(Deserialize)]
struct UrlResponse {
    url: Option<String>,
}

/// Resolves share links through the video host's session API.
///
/// The title comes from the GraphQL `GetVideoSSR` query. The download URL comes from the
/// `raw-url` endpoint, or `transcoded-url` when `raw-url` has nothing.
pub struct SessionApiResolver {
    client: HttpClient,
    base: Url,
}

impl SessionApiResolver {
    pub fn new(client: HttpClient) -> KasaneResult<Self> {
        Self::with_base_url(client, DEFAULT_API_BASE)
    }

    pub fn with_base_url(client: HttpClient, base: &str) -> KasaneResult<Self> {
        Ok(Self {
            client,
            base: Url::parse(base)?,
        })
    }

    fn origin(&self) -> String {
        self.base.as_str().trim_end_matches('/').to_string()
    }

    /// Fetch title metadata. Password errors and missing videos are reported as errors.
    pub async fn video_metadata(
        &self,
        video_id: &str,
        password: Option<&str>,
    ) -> KasaneResult<VideoMetadata> {
        let body = [GraphqlOperation {
            operation_name: "GetVideoSSR",
            variables: GraphqlVariables { video_id, password },
            query: GET_VIDEO_QUERY,
        }];

        let origin = self.origin();
        let response = self
            .client
            .post(self.base.join("graphql")?)
            .header(header::ACCEPT, "application/json")
            .header(header::REFERER, format!("{origin}/"))
            .header(header::ORIGIN, &origin)
            .header("apollographql-client-name", "web")
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(KasaneError::HttpError(response.status()));
        }

        let responses: Vec<GraphqlResponse> = response.json().await?;
        let metadata = responses
            .into_iter()
            .next()
            .and_then(|r| r.data)
            .and_then(|d| d.get_video)
            .ok_or(KasaneError::VideoNotFound)?;

        if metadata.typename == "VideoPasswordMissingOrIncorrect" {
            return Err(KasaneError::PasswordRequired);
        }
        tracing::info!("Video title: {:?}", metadata.name);
        Ok(metadata)
    }

    /// Ask one of the session URL endpoints. `204 No Content` means no URL.
    pub async fn session_url(
        &self,
        endpoint: &str,
        video_id: &str,
        password: Option<&str>,
    ) -> KasaneResult<Option<String>> {
        let request = UrlRequest {
            anon_id: uuid::Uuid::new_v4().to_string(),
            device_id: None,
            force_original: false,
            password,
        };

        let origin = self.origin();
        let url = self
            .base
            .join(&format!("api/campaigns/sessions/{video_id}/{endpoint}"))?;
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .header(header::REFERER, format!("{origin}/"))
            .header(header::ORIGIN, &origin)
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => {
                tracing::debug!("{endpoint} returned no content");
                Ok(None)
            }
            status if status.is_success() => {
                let body: UrlResponse = response.json().await?;
                Ok(body.url)
            }
            status => Err(KasaneError::HttpError(status)),
        }
    }
}

impl ManifestUrlResolver for SessionApiResolver {
    async fn resolve_manifest_url(
        &self,
        target: &str,
        password: Option<&str>,
    ) -> KasaneResult<ResolvedAsset> {
        let link = ShareLink::parse(target)?;
        tracing::info!("Video ID: {} (embed: {})", link.video_id, link.is_embed);

        let metadata = self.video_metadata(&link.video_id, password).await?;

        let raw = self.session_url("raw-url", &link.video_id, password).await?;
        let url = match raw {
            Some(url) => url,
            None => match self
                .session_url("transcoded-url", &link.video_id, password)
                .await
            {
                Ok(Some(url)) => url,
                Ok(None) => return Err(KasaneError::VideoNotFound),
                Err(e) => {
                    tracing::warn!("transcoded-url failed: {e}");
                    return Err(KasaneError::VideoNotFound);
                }
            },
        };
        tracing::info!("Download URL: {url}");

        Ok(ResolvedAsset {
            manifest_url: Url::parse(&url)?,
            title: metadata.name,
        })
    }
}
