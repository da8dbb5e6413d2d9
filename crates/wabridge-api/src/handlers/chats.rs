//! Chat listing and lookup.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use wabridge_core::JidKind;
use wabridge_core::validation::{sanitize_search_query, validate_jid};
use wabridge_db::{Chat, ChatSort};
use wabridge_ipc::NetworkClient;

use crate::error::ApiError;
use crate::extract::pagination;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListChatsQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub query: Option<String>,
    pub sort: Option<String>,
}

/// A chat as returned over HTTP, with its derived classification.
#[derive(Debug, Serialize)]
pub struct ChatView {
    #[serde(flatten)]
    pub chat: Chat,
    pub kind: JidKind,
    pub is_group: bool,
}

impl From<Chat> for ChatView {
    fn from(chat: Chat) -> Self {
        let kind = chat.kind();
        Self {
            chat,
            kind,
            is_group: kind == JidKind::Group,
        }
    }
}

pub async fn list_chats<N: NetworkClient>(
    State(state): State<AppState<N>>,
    Query(params): Query<ListChatsQuery>,
) -> Result<ApiResponse<Vec<ChatView>>, ApiError> {
    let (limit, offset) = pagination(params.limit.as_deref(), params.offset.as_deref())?;
    let sort = match params.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<ChatSort>().map_err(ApiError::BadRequest)?,
        None => ChatSort::default(),
    };
    let query = params
        .query
        .as_deref()
        .map(sanitize_search_query)
        .filter(|q| !q.is_empty());

    let chats = state
        .db
        .search_chats(query.as_deref(), sort, limit, offset)
        .await?;

    Ok(ApiResponse::ok(chats.into_iter().map(ChatView::from).collect()))
}

pub async fn get_chat<N: NetworkClient>(
    State(state): State<AppState<N>>,
    Path(jid): Path<String>,
) -> Result<ApiResponse<ChatView>, ApiError> {
    validate_jid(&jid)?;
    let chat = state.db.get_chat(&jid).await?;
    Ok(ApiResponse::ok(ChatView::from(chat)))
}
