use std::fmt;

use serde::{Deserialize, Serialize};

// Numeric chat id ranges used by the Bot API.
//
// secret chat     [-2_002_147_483_648, -1_997_852_516_353)
// supergroup      [-1_002_147_483_647, -1_000_000_000_000)
// basic group     [-2_147_483_647, 0)
// private         (0, 2_147_483_647]
const MIN_SECRET_ID: i64 = -2_002_147_483_648;
const MAX_SECRET_ID: i64 = -1_997_852_516_353;
const ZERO_SECRET_ID: i64 = -2_000_000_000_000;

const MIN_CHANNEL_ID: i64 = -1_002_147_483_647;
const MAX_CHANNEL_ID: i64 = -1_000_000_000_000;

const MIN_CHAT_ID: i64 = -2_147_483_647;

const MAX_USER_ID: i64 = 2_147_483_647;

/// Destination of an outbound call: a numeric chat id or a `@channelusername`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Int(i64),
    Username(String),
}

/// Category of a chat id, derived from its numeric range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    BasicGroup,
    Supergroup,
    Secret,
    Username,
    Unclassified,
}

impl ChatId {
    /// Builds a textual handle, adding the leading `@` if it is missing.
    pub fn username(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.starts_with('@') {
            Self::Username(name)
        } else {
            Self::Username(format!("@{name}"))
        }
    }

    pub fn kind(&self) -> ChatKind {
        let id = match self {
            ChatId::Int(id) => *id,
            ChatId::Username(_) => return ChatKind::Username,
        };

        if id > 0 && id <= MAX_USER_ID {
            ChatKind::Private
        } else if (MIN_CHAT_ID..0).contains(&id) {
            ChatKind::BasicGroup
        } else if (MIN_CHANNEL_ID..MAX_CHANNEL_ID).contains(&id) {
            ChatKind::Supergroup
        } else if (MIN_SECRET_ID..MAX_SECRET_ID).contains(&id) {
            ChatKind::Secret
        } else {
            ChatKind::Unclassified
        }
    }

    /// Throttling heuristic: anything whose string form starts with `-` or `@`
    /// is paced at the group rate.
    ///
    /// This intentionally does not consult [`ChatId::kind`]: a negative id
    /// outside every known range is still throttled as a group.
    pub fn is_group_like(&self) -> bool {
        match self {
            ChatId::Int(id) => *id < 0,
            ChatId::Username(name) => name.starts_with('@') || name.starts_with('-'),
        }
    }

    pub fn to_user_id(&self) -> Option<i64> {
        self.int_of_kind(ChatKind::Private)
    }

    pub fn to_basic_group_id(&self) -> Option<i64> {
        self.int_of_kind(ChatKind::BasicGroup).map(|id| -id)
    }

    pub fn to_supergroup_id(&self) -> Option<i64> {
        self.int_of_kind(ChatKind::Supergroup).map(|id| MAX_CHANNEL_ID - id)
    }

    pub fn to_secret_chat_id(&self) -> Option<i64> {
        self.int_of_kind(ChatKind::Secret).map(|id| id - ZERO_SECRET_ID)
    }

    fn int_of_kind(&self, kind: ChatKind) -> Option<i64> {
        match self {
            ChatId::Int(id) if self.kind() == kind => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Int(id) => write!(f, "{id}"),
            ChatId::Username(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Int(id)
    }
}

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);
