//! Messages exchanged with the host collaborator (popup / background side).
//!
//! Wire names follow the extension runtime's `action` convention.

use serde::{Deserialize, Serialize};

/// Commands the host sends to the page agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum HostCommand {
    FillCredentials {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
    ShowCredentialPicker {
        #[serde(default)]
        domain: Option<String>,
    },
    ShowPasswordGenerator,
    CheckContentScriptActive,
}

impl HostCommand {
    /// Wire name, safe to log (never carries credentials)
    pub fn action(&self) -> &'static str {
        match self {
            HostCommand::FillCredentials { .. } => "fillCredentials",
            HostCommand::ShowCredentialPicker { .. } => "showCredentialPicker",
            HostCommand::ShowPasswordGenerator => "showPasswordGenerator",
            HostCommand::CheckContentScriptActive => "checkContentScriptActive",
        }
    }
}

/// Replies to a [`HostCommand`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandResponse {
    Active { active: bool },
    Generated { success: bool, password: String },
    Picker { success: bool, domain: String },
    Done { success: bool },
}

impl CommandResponse {
    pub fn success(&self) -> bool {
        match self {
            CommandResponse::Active { active } => *active,
            CommandResponse::Generated { success, .. }
            | CommandResponse::Picker { success, .. }
            | CommandResponse::Done { success } => *success,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// Messages the page agent sends to the host, fire-and-forget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum HostMessage {
    #[serde(rename_all = "camelCase")]
    LoginFormDetected {
        forms_count: usize,
        url: String,
        domain: String,
    },
    Notice { message: String, kind: NoticeKind },
}
