use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Id;

/// An authenticated identity as carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserRef {
    pub id: Id,
    pub username: String,
}

/// Who is making the current request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(UserRef),
}

impl Viewer {
    pub fn user(id: Id, username: impl Into<String>) -> Self {
        Viewer::User(UserRef { id, username: username.into() })
    }

    pub fn user_id(&self) -> Option<Id> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(u) => Some(u.id),
        }
    }

    /// True when the viewer is the given user. Anonymous is never anyone.
    pub fn is(&self, user_id: Id) -> bool {
        self.user_id() == Some(user_id)
    }
}

impl From<UserRef> for Viewer {
    fn from(u: UserRef) -> Self {
        Viewer::User(u)
    }
}
