use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::access::Zone;

// --- Identity Schemas (Owned by the external identity service) ---

/// Role
///
/// The closed set of SkillBridge roles. This is the single definition shared by the
/// access router and, through the generated TypeScript binding, by every role-gated
/// page in the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Student,
    Tutor,
    Admin,
}

impl Role {
    /// The zone this role may visit without being redirected.
    pub fn zone(self) -> Zone {
        match self {
            Role::Student => Zone::Student,
            Role::Tutor => Zone::Tutor,
            Role::Admin => Zone::Admin,
        }
    }

    /// home_route
    ///
    /// Landing page for the role. Every redirect of an authenticated user goes here,
    /// and each home route sits inside the role's own zone so a redirect never loops.
    pub fn home_route(self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Tutor => "/tutor/dashboard",
            Role::Student => "/dashboard",
        }
    }
}

/// SessionUser
///
/// The user attached to a resolved session. Routing only reads `role`; the
/// profile fields are carried through for `/api/session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub image: Option<String>,
}

/// SessionPayload
///
/// Body of `GET {AUTH_URL}/get-session`. Other top-level fields (session metadata,
/// expiry) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionPayload {
    #[serde(default)]
    pub user: Option<SessionUser>,
}

// --- Response Envelopes ---

/// SessionResponse
///
/// Uniform `{ success, data, message, error }` envelope returned by `GET /api/session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub success: bool,
    pub data: SessionPayload,
    pub message: String,
    pub error: Option<String>,
}

impl SessionResponse {
    pub fn resolved(user: Option<SessionUser>) -> Self {
        let message = if user.is_some() {
            "Session retrieved"
        } else {
            "No active session"
        };
        Self {
            success: true,
            data: SessionPayload { user },
            message: message.to_string(),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            data: SessionPayload::default(),
            message: "Session lookup failed".to_string(),
            error: Some(error),
        }
    }
}
