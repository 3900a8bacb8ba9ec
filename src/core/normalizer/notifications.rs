#![allow(clippy::result_large_err)]

use super::EntityNormalizer;
use crate::core::document::{NotificationKind, NotificationRecord, NotificationTarget};
use crate::core::error::AppError;
use crate::core::snapshot::Notification;
use crate::core::types::ResourceType;
use indexmap::IndexMap;

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Classify a notification by which target fields are populated.
///
/// Slack channel fields win over an email address, which wins over a URL.
pub fn classify(notification: &Notification) -> NotificationKind {
    if present(&notification.slack_channel_name).is_some()
        || present(&notification.slack_channel_id).is_some()
    {
        NotificationKind::Slack
    } else if present(&notification.external_email).is_some() {
        NotificationKind::Email
    } else if present(&notification.url).is_some() {
        NotificationKind::Webhook
    } else {
        NotificationKind::Unknown
    }
}

fn target_for(kind: NotificationKind, notification: &Notification) -> NotificationTarget {
    let mut target = NotificationTarget::default();
    match kind {
        NotificationKind::Slack => {
            target.channel = present(&notification.slack_channel_name)
                .or_else(|| present(&notification.slack_channel_id))
                .map(str::to_string);
        }
        NotificationKind::Email => {
            target.email = present(&notification.external_email).map(str::to_string);
        }
        NotificationKind::Webhook => {
            target.url = present(&notification.url).map(str::to_string);
        }
        NotificationKind::Unknown => {}
    }
    target
}

pub fn normalize_notifications(
    normalizer: &mut EntityNormalizer<'_>,
    notifications: &IndexMap<String, Notification>,
) -> Result<Option<Vec<NotificationRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::Notifications,
        None,
        notifications.values().map(|n| (n.key.as_str(), n)),
        |n, key, notification| {
            let kind = classify(notification);
            if kind == NotificationKind::Unknown {
                tracing::warn!(key = %key.local, "notification has no recognizable target");
            }
            Ok(NotificationRecord {
                key: key.local,
                kind,
                target: target_for(kind, notification),
                on_success: notification.on_success.clone(),
                on_failure: notification.on_failure.clone(),
                on_cancel: notification.on_cancel.clone(),
                id: n.source_id(notification.id),
            })
        },
    )
}
