//! Notification descriptors rendered from push payloads.
//!
//! The gateway does not display notifications itself; it renders the
//! descriptor the client should show, including the open/close actions.

use serde::{Deserialize, Serialize};

const DEFAULT_ICON: &str = "/icon-192.png";
const DEFAULT_BADGE: &str = "/icon-72.png";

/// An action button attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// URL the client navigates to when the action fires, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// A user notification rendered from a push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build a notification from a push payload.
    ///
    /// `payload` is the push message text, `default_body` is used when the
    /// push carried no data. `arrival_ms` is the receive timestamp in epoch
    /// milliseconds.
    pub fn from_push(
        title: &str,
        payload: Option<&str>,
        default_body: &str,
        app_root: &str,
        arrival_ms: i64,
    ) -> Self {
        let body = match payload {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => default_body.to_string(),
        };

        Notification {
            title: title.to_string(),
            body,
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            vibrate: vec![200, 100, 200],
            data: NotificationData {
                date_of_arrival: arrival_ms,
                primary_key: 1,
            },
            actions: vec![
                NotificationAction {
                    action: "open".to_string(),
                    title: format!("Abrir {title}"),
                    icon: Some(DEFAULT_ICON.to_string()),
                    url: Some(app_root.to_string()),
                },
                NotificationAction {
                    action: "close".to_string(),
                    title: "Fechar".to_string(),
                    icon: None,
                    url: None,
                },
            ],
        }
    }
}
