use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::domain::error::SyncError;
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::presence::{LastOpened, Session, StudyGroup};
use crate::domain::request::{MatchRequest, MatchTarget, RequestStatus, SwipeDirection};
use crate::infra::api::{NewNotification, NewSwipe, StudyApi};

/// HTTP+JSON implementation of [`StudyApi`], bearer-token authenticated.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(config: &SyncConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_seconds))
            .build()?;
        let base_url = Url::parse(&config.api_base_url)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.base_url
            .join(path)
            .map_err(|err| SyncError::network(format!("bad endpoint {}: {}", path, err)))
    }

    /// Map the response status into the error taxonomy, passing 2xx through.
    async fn checked(response: Response) -> Result<Response, SyncError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(SyncError::Unauthenticated),
            StatusCode::NOT_FOUND => Err(SyncError::NotFound),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SyncError::network(format!("{}: {}", status, body)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes (camelCase JSON, nullable target pair)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwipeBody<'a> {
    user_id: Uuid,
    target_id: Uuid,
    direction: SwipeDirection,
    is_study_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[derive(Deserialize)]
struct CreatedRow {
    id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwipeRow {
    id: Uuid,
    user_id: Uuid,
    target_user_id: Option<Uuid>,
    target_group_id: Option<Uuid>,
    direction: SwipeDirection,
    status: RequestStatus,
    message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl SwipeRow {
    /// Rows naming both or neither target are malformed; the caller drops
    /// them rather than failing the whole fetch.
    fn into_request(self) -> Result<MatchRequest, SyncError> {
        let target = MatchTarget::from_wire(self.target_user_id, self.target_group_id)?;
        Ok(MatchRequest {
            id: self.id,
            requester_id: self.user_id,
            target,
            direction: self.direction,
            status: self.status,
            message: self.message,
            created_at: self.created_at,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    status: RequestStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendNotificationBody<'a> {
    user_id: Uuid,
    message: &'a str,
    #[serde(rename = "type")]
    kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    study_group_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    other_user_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastOpenedRow {
    chat_id: Uuid,
    user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateLastOpenedBody {
    chat_id: Uuid,
    user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    last_opened: OffsetDateTime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatCheckRow {
    chat_id: Option<Uuid>,
}

#[async_trait]
impl StudyApi for HttpApi {
    async fn submit_swipe(&self, session: &Session, swipe: &NewSwipe) -> Result<Uuid, SyncError> {
        let (target_user, target_group) = swipe.target.as_wire();
        let body = SwipeBody {
            user_id: swipe.requester_id,
            target_id: target_user.or(target_group).ok_or(SyncError::InvalidTarget)?,
            direction: swipe.direction,
            is_study_group: target_group.is_some(),
            message: swipe.message.as_deref(),
        };
        let response = self
            .client
            .post(self.endpoint("swipe")?)
            .bearer_auth(&session.token)
            .json(&body)
            .send()
            .await?;
        let row: CreatedRow = Self::checked(response).await?.json().await?;
        Ok(row.id)
    }

    async fn swipe_requests(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> Result<Vec<MatchRequest>, SyncError> {
        let response = self
            .client
            .get(self.endpoint(&format!("swipe/{}", user_id))?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        let rows: Vec<SwipeRow> = Self::checked(response).await?.json().await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match row.into_request() {
                Ok(request) => requests.push(request),
                Err(err) => warn!(request_id = %id, error = %err, "dropping malformed swipe row"),
            }
        }
        Ok(requests)
    }

    async fn set_request_status(
        &self,
        session: &Session,
        request_id: Uuid,
        status: RequestStatus,
    ) -> Result<(), SyncError> {
        let response = self
            .client
            .post(self.endpoint(&format!("swipe/status/{}", request_id))?)
            .bearer_auth(&session.token)
            .json(&StatusBody { status })
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn send_notification(
        &self,
        session: &Session,
        notification: &NewNotification,
    ) -> Result<(), SyncError> {
        let body = SendNotificationBody {
            user_id: notification.recipient_id,
            message: &notification.message,
            kind: notification.kind,
            chat_id: notification.chat_id,
            study_group_id: notification.study_group_id,
            other_user_id: notification.other_user_id,
        };
        let response = self
            .client
            .post(self.endpoint("notifications/send")?)
            .bearer_auth(&session.token)
            .json(&body)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn notifications(&self, session: &Session) -> Result<Vec<Notification>, SyncError> {
        let response = self
            .client
            .get(self.endpoint("notifications")?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn delete_notification(&self, session: &Session, id: Uuid) -> Result<(), SyncError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("notifications/delete/{}", id))?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn delete_all_notifications(&self, session: &Session) -> Result<(), SyncError> {
        let response = self
            .client
            .delete(self.endpoint("notifications/deleteAll")?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn last_opened(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> Result<Vec<LastOpened>, SyncError> {
        let response = self
            .client
            .get(self.endpoint(&format!("chats/lastOpened/{}", user_id))?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        let rows: Vec<LastOpenedRow> = Self::checked(response).await?.json().await?;
        Ok(rows
            .into_iter()
            .map(|row| LastOpened {
                chat_id: row.chat_id,
                user_id: row.user_id,
                timestamp: row.timestamp,
            })
            .collect())
    }

    async fn update_last_opened(
        &self,
        session: &Session,
        mark: &LastOpened,
    ) -> Result<(), SyncError> {
        let response = self
            .client
            .post(self.endpoint("chats/updateLastOpened")?)
            .bearer_auth(&session.token)
            .json(&UpdateLastOpenedBody {
                chat_id: mark.chat_id,
                user_id: mark.user_id,
                last_opened: mark.timestamp,
            })
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn direct_chat_between(
        &self,
        session: &Session,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Uuid>, SyncError> {
        let mut url = self.endpoint("chats/check")?;
        url.query_pairs_mut()
            .append_pair("userId1", &user_a.to_string())
            .append_pair("userId2", &user_b.to_string());
        let response = self
            .client
            .get(url)
            .bearer_auth(&session.token)
            .send()
            .await?;
        let row: ChatCheckRow = Self::checked(response).await?.json().await?;
        Ok(row.chat_id)
    }

    async fn study_group(
        &self,
        session: &Session,
        group_id: Uuid,
    ) -> Result<StudyGroup, SyncError> {
        let response = self
            .client
            .get(self.endpoint(&format!("study-groups/{}", group_id))?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn study_group_for_chat(
        &self,
        session: &Session,
        chat_id: Uuid,
    ) -> Result<Option<StudyGroup>, SyncError> {
        let response = self
            .client
            .get(self.endpoint(&format!("study-groups/chat/{}", chat_id))?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        match Self::checked(response).await {
            Ok(response) => Ok(response.json().await?),
            Err(SyncError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
