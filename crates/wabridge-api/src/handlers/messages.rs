//! Message timelines, search, and surrounding context.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use wabridge_core::validation::{
    sanitize_search_query, validate_context, validate_date, validate_jid,
};
use wabridge_db::{Message, MessageContext, MessageFilter, MessageRecord};
use wabridge_ipc::NetworkClient;

use crate::error::ApiError;
use crate::extract::{pagination, parse_int};
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_CONTEXT_WINDOW: i64 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct ListMessagesQuery {
    pub chat_jid: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub query: Option<String>,
    pub sender: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
}

/// A plain chat timeline, or search hits that also carry their chat's name.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessagePage {
    Timeline(Vec<Message>),
    Search(Vec<MessageRecord>),
}

impl MessagePage {
    pub fn len(&self) -> usize {
        match self {
            MessagePage::Timeline(messages) => messages.len(),
            MessagePage::Search(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub async fn list_messages<N: NetworkClient>(
    State(state): State<AppState<N>>,
    Query(params): Query<ListMessagesQuery>,
) -> Result<ApiResponse<MessagePage>, ApiError> {
    let (limit, offset) = pagination(params.limit.as_deref(), params.offset.as_deref())?;

    let chat_jid = match params.chat_jid.as_deref().filter(|j| !j.is_empty()) {
        Some(jid) => {
            validate_jid(jid)?;
            // Unknown chats are a 404 rather than an empty page.
            state.db.get_chat(jid).await?;
            Some(jid.to_string())
        }
        None => None,
    };

    let filter = MessageFilter {
        query: params
            .query
            .as_deref()
            .map(sanitize_search_query)
            .filter(|q| !q.is_empty()),
        chat_jid,
        sender: params
            .sender
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        after: parse_date(params.after.as_deref())?,
        before: parse_date(params.before.as_deref())?,
    };

    let page = match &filter {
        MessageFilter {
            chat_jid: Some(jid),
            query: None,
            sender: None,
            after: None,
            before: None,
        } => MessagePage::Timeline(state.db.list_messages(jid, limit, offset).await?),
        _ => MessagePage::Search(state.db.search_messages(&filter, limit, offset).await?),
    };

    Ok(ApiResponse::ok(page))
}

#[derive(Debug, Default, Deserialize)]
pub struct ContextQuery {
    pub chat_jid: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
}

pub async fn message_context<N: NetworkClient>(
    State(state): State<AppState<N>>,
    Path(id): Path<String>,
    Query(params): Query<ContextQuery>,
) -> Result<ApiResponse<MessageContext>, ApiError> {
    let chat_jid = params.chat_jid.unwrap_or_default();
    validate_jid(&chat_jid)?;
    let (before, after) = validate_context(
        parse_int("before", params.before.as_deref())?.unwrap_or(DEFAULT_CONTEXT_WINDOW),
        parse_int("after", params.after.as_deref())?.unwrap_or(DEFAULT_CONTEXT_WINDOW),
    )?;

    let context = state
        .db
        .message_context(&id, &chat_jid, before, after)
        .await?;
    Ok(ApiResponse::ok(context))
}

fn parse_date(value: Option<&str>) -> Result<Option<i64>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Ok(Some(validate_date(raw)?.timestamp())),
        None => Ok(None),
    }
}
