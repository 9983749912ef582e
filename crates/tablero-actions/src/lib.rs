// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Blocking HTTP client for the server-action surface. Every action
//! returns the discriminated `{status, data?, message, error?}` envelope;
//! decoding maps it onto the typed error taxonomy so callers can route
//! failures to inline field messages versus transient toasts.

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tablero_app::{
    ActionEnvelope, ActionError, ActionStatus, AppSetting, Attachment, AttachmentUpload,
    InlinePatch, ItemOption, ScreenKind, SortMove,
};
use tablero_sync::{ListQuery, PageData};
use tracing::debug;
use url::Url;

pub const ASSET_BASE_ENV: &str = "TABLERO_ASSET_BASE_URL";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct ListBody {
    filter: String,
    offset: usize,
}

#[derive(Debug, Serialize)]
struct PatchBody<'a> {
    uid: &'a str,
    patch: &'a InlinePatch,
}

#[derive(Debug, Serialize)]
struct SortBody<'a> {
    uid: &'a str,
    direction: SortMove,
}

#[derive(Debug, Serialize)]
struct UploadBody<'a> {
    uid: &'a str,
    owner_uid: &'a str,
    file_name: &'a str,
    mime_type: &'a str,
    data_base64: String,
}

#[derive(Debug, serde::Deserialize)]
struct DeletedPayload {
    removed: usize,
}

#[derive(Debug, serde::Deserialize)]
struct CreatedPayload {
    uid: String,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("invalid server base URL {base_url:?}"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // Startup reachability probe (`--check`).
    pub fn ping(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .map_err(|error| anyhow::Error::new(connection_error(&self.base_url, error)))?;
        let status = response.status();
        if !status.is_success() {
            bail!("action server responded {status} to the health probe");
        }
        Ok(())
    }

    pub fn list<T: DeserializeOwned>(
        &self,
        screen: ScreenKind,
        query: &ListQuery,
    ) -> Result<PageData<T>, ActionError> {
        // The canonical query string is the wire form of the filter set,
        // so the URL the admin shares and the list request stay one
        // representation.
        let body = ListBody {
            filter: query.filter.to_query_string(),
            offset: query.offset,
        };
        debug!(screen = screen.as_str(), offset = query.offset, "list action");
        self.post_action(screen, "list", &body)
    }

    pub fn show<T: DeserializeOwned>(
        &self,
        screen: ScreenKind,
        uid: &str,
    ) -> Result<T, ActionError> {
        self.post_action(screen, "show", &serde_json::json!({ "uid": uid }))
    }

    pub fn create<B: Serialize>(&self, screen: ScreenKind, body: &B) -> Result<String, ActionError> {
        let created: CreatedPayload = self.post_action(screen, "create", body)?;
        Ok(created.uid)
    }

    pub fn update<B: Serialize>(
        &self,
        screen: ScreenKind,
        uid: &str,
        body: &B,
    ) -> Result<(), ActionError> {
        let payload = serde_json::json!({ "uid": uid, "fields": body });
        self.post_action_unit(screen, "update", &payload)
    }

    // Single and bulk delete share one wire call.
    pub fn delete(&self, screen: ScreenKind, uids: &[String]) -> Result<usize, ActionError> {
        let removed: DeletedPayload =
            self.post_action(screen, "delete", &serde_json::json!({ "uids": uids }))?;
        Ok(removed.removed)
    }

    pub fn restore(&self, screen: ScreenKind, uids: &[String]) -> Result<usize, ActionError> {
        #[derive(serde::Deserialize)]
        struct RestoredPayload {
            restored: usize,
        }
        let restored: RestoredPayload =
            self.post_action(screen, "restore", &serde_json::json!({ "uids": uids }))?;
        Ok(restored.restored)
    }

    pub fn list_update(
        &self,
        screen: ScreenKind,
        uid: &str,
        patch: &InlinePatch,
    ) -> Result<(), ActionError> {
        self.post_action_unit(screen, "list_update", &PatchBody { uid, patch })
    }

    pub fn list_sort(&self, uid: &str, direction: SortMove) -> Result<bool, ActionError> {
        #[derive(serde::Deserialize)]
        struct MovedPayload {
            moved: bool,
        }
        let moved: MovedPayload = self.post_action(
            ScreenKind::ShopItems,
            "list_sort",
            &SortBody { uid, direction },
        )?;
        Ok(moved.moved)
    }

    pub fn upload(&self, upload: &AttachmentUpload) -> Result<Attachment, ActionError> {
        upload.validate().map_err(ActionError::Validation)?;
        let body = UploadBody {
            uid: upload.uid.as_str(),
            owner_uid: &upload.owner_uid,
            file_name: &upload.file_name,
            mime_type: &upload.mime_type,
            data_base64: BASE64.encode(&upload.data),
        };
        let envelope: ActionEnvelope<Attachment> = self.post_envelope("files/upload", &body)?;
        envelope.into_result()
    }

    pub fn list_files(&self, owner_uid: &str) -> Result<Vec<Attachment>, ActionError> {
        let envelope: ActionEnvelope<Vec<Attachment>> =
            self.post_envelope("files/list", &serde_json::json!({ "owner_uid": owner_uid }))?;
        envelope.into_result()
    }

    pub fn delete_file(&self, uid: &str) -> Result<(), ActionError> {
        self.post_unit("files/delete", &serde_json::json!({ "uid": uid }))
    }

    // Option rows for one shop item's nested sub-form.
    pub fn item_options(&self, item_uid: &str) -> Result<Vec<ItemOption>, ActionError> {
        let envelope: ActionEnvelope<Vec<ItemOption>> = self.post_envelope(
            "actions/shop_items/options",
            &serde_json::json!({ "uid": item_uid }),
        )?;
        envelope.into_result()
    }

    pub fn settings_list(&self) -> Result<Vec<AppSetting>, ActionError> {
        let envelope: ActionEnvelope<Vec<AppSetting>> =
            self.post_envelope("actions/settings/list", &serde_json::json!({}))?;
        envelope.into_result()
    }

    pub fn settings_put(&self, setting: &AppSetting) -> Result<(), ActionError> {
        self.post_unit("actions/settings/update", setting)
    }

    fn post_action<B: Serialize, T: DeserializeOwned>(
        &self,
        screen: ScreenKind,
        action: &str,
        body: &B,
    ) -> Result<T, ActionError> {
        let path = format!("actions/{}/{action}", screen.as_str());
        let envelope: ActionEnvelope<T> = self.post_envelope(&path, body)?;
        envelope.into_result()
    }

    fn post_action_unit<B: Serialize>(
        &self,
        screen: ScreenKind,
        action: &str,
        body: &B,
    ) -> Result<(), ActionError> {
        let path = format!("actions/{}/{action}", screen.as_str());
        self.post_unit(&path, body)
    }

    // Unit-result actions succeed without a data payload.
    fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ActionError> {
        let envelope: ActionEnvelope<serde_json::Value> = self.post_envelope(path, body)?;
        match envelope.status {
            ActionStatus::Success => Ok(()),
            ActionStatus::Error => match envelope.into_result() {
                Err(error) => Err(error),
                Ok(_) => Err(ActionError::unexpected("error envelope decoded as success")),
            },
        }
    }

    fn post_envelope<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ActionEnvelope<T>, ActionError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .json(body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(clean_error_response(status, response));
        }

        response
            .json()
            .map_err(|error| ActionError::unexpected(format!("decode action envelope: {error}")))
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> ActionError {
    if error.is_timeout() {
        return ActionError::unexpected(format!(
            "action server at {base_url} timed out; retry or raise server.timeout"
        ));
    }
    if error.is_connect() {
        return ActionError::unexpected(format!(
            "cannot reach the action server at {base_url}; check server.base_url"
        ));
    }
    ActionError::unexpected(error)
}

fn clean_error_response(status: StatusCode, response: Response) -> ActionError {
    // Some proxies answer errors with a JSON envelope of their own; pull
    // its message out when present instead of dumping raw HTML.
    let body = response.text().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ActionEnvelope<serde_json::Value>>(&body)
        && let Err(error) = envelope.into_result()
    {
        return error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        ActionError::failed(format!("action server responded {status}"))
    } else {
        let snippet: String = trimmed.chars().take(200).collect();
        ActionError::failed(format!("action server responded {status}: {snippet}"))
    }
}

// Static asset base for resolving an attachment's public URL from its
// stored relative path.
pub fn asset_base_url() -> Result<Url> {
    let raw = std::env::var(ASSET_BASE_ENV)
        .with_context(|| format!("{ASSET_BASE_ENV} is not set; export the static asset base URL"))?;
    let mut parsed =
        Url::parse(raw.trim()).with_context(|| format!("invalid {ASSET_BASE_ENV} {raw:?}"))?;
    // A base without a trailing slash would swallow its last path segment
    // on join.
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    Ok(parsed)
}

pub fn resolve_asset_url(base: &Url, stored_path: &str) -> Result<Url> {
    base.join(stored_path.trim_start_matches('/'))
        .with_context(|| format!("resolve asset URL for {stored_path:?}"))
}

#[cfg(test)]
mod tests {
    use super::{Client, resolve_asset_url};
    use std::time::Duration;
    use url::Url;

    #[test]
    fn client_rejects_empty_and_malformed_base_urls() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
        let client =
            Client::new("http://localhost:4000/api/", Duration::from_secs(1)).expect("valid");
        assert_eq!(client.base_url(), "http://localhost:4000/api");
    }

    #[test]
    fn asset_urls_join_relative_paths() {
        let base = Url::parse("https://cdn.example.com/static/").expect("base");
        let resolved =
            resolve_asset_url(&base, "uploads/p-1/banner.png").expect("resolved");
        assert_eq!(
            resolved.as_str(),
            "https://cdn.example.com/static/uploads/p-1/banner.png"
        );

        let absolute = resolve_asset_url(&base, "/uploads/p-1/banner.png").expect("resolved");
        assert_eq!(
            absolute.as_str(),
            "https://cdn.example.com/static/uploads/p-1/banner.png"
        );
    }
}
