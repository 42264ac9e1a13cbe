//! Push notifications
//!
//! Notifications are fire-and-forget: delivery failures are logged and never
//! reach the caller, and request paths hand messages to [`NotificationService::dispatch`]
//! so a slow push endpoint cannot hold them up.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use async_trait::async_trait;

use crate::config::NotificationsConfig;

pub const HEARTBEAT_MESSAGE: &str = "Still going strong!";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);

    /// False when messages are dropped instead of delivered
    fn enabled(&self) -> bool {
        true
    }
}

/// Pushover-style form POST (`token`, `user`, `message`)
pub struct PushNotifier {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    user_key: String,
}

impl PushNotifier {
    pub fn new(
        api_url: String,
        api_token: String,
        user_key: String,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_token,
            user_key,
        })
    }
}

#[async_trait]
impl Notifier for PushNotifier {
    async fn notify(&self, message: &str) {
        tracing::info!("Sending push notification: {}", message);

        let result = self
            .client
            .post(&self.api_url)
            .form(&[
                ("token", self.api_token.as_str()),
                ("user", self.user_key.as_str()),
                ("message", message),
            ])
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        if let Err(e) = result {
            tracing::warn!("Failed to send push notification: {}", e);
        }
    }
}

/// Notifier used when notifications are disabled
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, message: &str) {
        tracing::debug!("Notifications disabled, dropping: {}", message);
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// Build the notifier described by the configuration
pub fn notifier_from_config(config: &NotificationsConfig) -> Arc<dyn Notifier> {
    match (config.enabled, &config.api_token, &config.user_key) {
        (true, Some(token), Some(user)) => match PushNotifier::new(
            config.api_url.clone(),
            token.clone(),
            user.clone(),
            Duration::from_secs(config.request_timeout_secs),
        ) {
            Ok(notifier) => Arc::new(notifier),
            Err(e) => {
                tracing::warn!("Failed to build push client, disabling notifications: {}", e);
                Arc::new(NoopNotifier)
            }
        },
        (true, _, _) => {
            tracing::warn!("Notifications enabled without api_token/user_key, disabling");
            Arc::new(NoopNotifier)
        }
        _ => Arc::new(NoopNotifier),
    }
}

#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    /// `None` until the first message goes out, so a heartbeat is due at startup
    last_sent: Arc<Mutex<Option<Instant>>>,
    heartbeat_interval: Duration,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, heartbeat_interval: Duration) -> Self {
        Self {
            notifier,
            last_sent: Arc::new(Mutex::new(None)),
            heartbeat_interval,
        }
    }

    pub async fn notify(&self, message: &str) {
        self.notifier.notify(message).await;
        if let Ok(mut last) = self.last_sent.lock() {
            *last = Some(Instant::now());
        }
    }

    /// Send from a detached task; the caller never waits on delivery
    pub fn dispatch(&self, message: String) {
        let service = self.clone();
        tokio::spawn(async move {
            service.notify(&message).await;
        });
    }

    fn heartbeat_due(&self) -> bool {
        self.last_sent
            .lock()
            .map(|last| match *last {
                Some(at) => at.elapsed() >= self.heartbeat_interval,
                None => true,
            })
            .unwrap_or(false)
    }

    /// Send the heartbeat if nothing went out for a full interval
    pub async fn send_heartbeat_if_due(&self) -> bool {
        if !self.heartbeat_due() {
            return false;
        }
        self.notify(HEARTBEAT_MESSAGE).await;
        true
    }

    /// Background task checking for a due heartbeat
    pub fn spawn_heartbeat(&self) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        let period = service.heartbeat_interval.min(Duration::from_secs(60)).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                service.send_heartbeat_if_due().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{http::StatusCode, routing::post, Form, Router};
    use mockall::predicate::eq;
    use tokio::sync::mpsc;

    use super::*;

    type Captured = mpsc::UnboundedReceiver<HashMap<String, String>>;

    /// Local push endpoint recording each form it receives
    async fn push_endpoint(status: StatusCode) -> (String, Captured) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/messages.json",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(form);
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/messages.json", addr), rx)
    }

    fn push_notifier(url: String, timeout: Duration) -> PushNotifier {
        PushNotifier::new(url, "app-token".to_string(), "user-key".to_string(), timeout).unwrap()
    }

    #[tokio::test]
    async fn test_heartbeat_sent_when_due() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .with(eq(HEARTBEAT_MESSAGE))
            .times(1)
            .returning(|_| ());

        let service = NotificationService::new(Arc::new(notifier), Duration::ZERO);
        assert!(service.send_heartbeat_if_due().await);
    }

    #[tokio::test]
    async fn test_first_heartbeat_sent_at_startup() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .with(eq(HEARTBEAT_MESSAGE))
            .times(1)
            .returning(|_| ());

        let service = NotificationService::new(Arc::new(notifier), Duration::from_secs(6 * 3600));
        assert!(service.send_heartbeat_if_due().await);
        assert!(!service.send_heartbeat_if_due().await);
    }

    #[tokio::test]
    async fn test_heartbeat_skipped_after_recent_message() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| ());

        let service = NotificationService::new(Arc::new(notifier), Duration::from_secs(3600));
        service.notify("Key 101 borrowed").await;
        assert!(!service.send_heartbeat_if_due().await);
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(move |message| {
            let _ = tx.send(message.to_string());
        });

        let service = NotificationService::new(Arc::new(notifier), Duration::from_secs(3600));
        service.dispatch("Key 101 borrowed".to_string());

        let delivered = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(delivered.as_deref(), Some("Key 101 borrowed"));
    }

    #[test]
    fn test_disabled_config_builds_noop() {
        let disabled = NotificationsConfig::default();
        assert!(!notifier_from_config(&disabled).enabled());

        let missing_credentials = NotificationsConfig {
            enabled: true,
            api_token: None,
            user_key: Some("user-key".to_string()),
            ..NotificationsConfig::default()
        };
        assert!(!notifier_from_config(&missing_credentials).enabled());

        let complete = NotificationsConfig {
            enabled: true,
            api_token: Some("app-token".to_string()),
            user_key: Some("user-key".to_string()),
            ..NotificationsConfig::default()
        };
        assert!(notifier_from_config(&complete).enabled());
    }

    #[tokio::test]
    async fn test_push_sends_form_fields() {
        let (url, mut captured) = push_endpoint(StatusCode::OK).await;

        push_notifier(url, Duration::from_secs(5))
            .notify("Key 101 borrowed")
            .await;

        let form = captured.recv().await.unwrap();
        assert_eq!(form.get("token").map(String::as_str), Some("app-token"));
        assert_eq!(form.get("user").map(String::as_str), Some("user-key"));
        assert_eq!(form.get("message").map(String::as_str), Some("Key 101 borrowed"));
    }

    #[tokio::test]
    async fn test_push_error_status_is_swallowed() {
        let (url, mut captured) = push_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;

        push_notifier(url, Duration::from_secs(5)).notify("Key 101 borrowed").await;

        assert!(captured.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_push_gives_up_on_stalled_endpoint() {
        let app = Router::new().route(
            "/messages.json",
            post(|| async {
                std::future::pending::<()>().await;
                StatusCode::OK
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let notifier = push_notifier(
            format!("http://{}/messages.json", addr),
            Duration::from_millis(200),
        );
        let finished = tokio::time::timeout(Duration::from_secs(5), notifier.notify("Key 101 borrowed")).await;
        assert!(finished.is_ok());
    }
}
