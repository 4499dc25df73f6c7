//! Explicit session state shared by the controllers.
//!
//! Controllers receive a [`SessionSubscription`] at construction and drop or
//! [`unsubscribe`](SessionSubscription::unsubscribe) it on teardown.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::gateway::{AuthUser, Gateway};

#[derive(Clone)]
pub struct SessionContext {
    state: Arc<watch::Sender<Option<AuthUser>>>,
    gateway: Arc<dyn Gateway>,
}

impl SessionContext {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
            gateway,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<AuthUser> {
        if email.trim().is_empty() {
            return Err(ServiceError::validation("email", "is required"));
        }
        if password.is_empty() {
            return Err(ServiceError::validation("password", "is required"));
        }
        match self.gateway.sign_in(email.trim(), password).await {
            Ok(user) => {
                info!(user_id = %user.id, "Signed in");
                self.state.send_replace(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Sign-in rejected");
                Err(e.into())
            }
        }
    }

    pub fn sign_out(&self) {
        if self.state.send_replace(None).is_some() {
            info!("Signed out");
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.state.subscribe(),
        }
    }

    /// Live subscriptions; drops to zero once every controller has torn down.
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }
}

/// A controller's view of the session.
pub struct SessionSubscription {
    receiver: watch::Receiver<Option<AuthUser>>,
}

impl SessionSubscription {
    pub fn current(&self) -> Option<AuthUser> {
        self.receiver.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    pub fn require_user(&self) -> ServiceResult<AuthUser> {
        self.current()
            .ok_or_else(|| ServiceError::Unauthorized("sign in required".to_string()))
    }

    /// Waits for the next sign-in or sign-out. `false` once the context is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayActor, MemoryConfig};

    fn context() -> SessionContext {
        let (actor, client) = GatewayActor::new(MemoryConfig::new().account("admin@otocap.local", "secret", "Admin"));
        tokio::spawn(actor.run());
        SessionContext::new(Arc::new(client))
    }

    #[tokio::test]
    async fn sign_in_notifies_subscribers() {
        let session = context();
        let mut sub = session.subscribe();
        assert!(sub.require_user().is_err());

        session.sign_in("admin@otocap.local", "secret").await.unwrap();
        assert!(sub.changed().await);
        assert!(sub.is_signed_in());
        assert_eq!(sub.current().and_then(|u| u.email).as_deref(), Some("admin@otocap.local"));

        session.sign_out();
        assert!(sub.changed().await);
        assert!(matches!(sub.require_user(), Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn wrong_password_keeps_session_empty() {
        let session = context();
        let err = session.sign_in("admin@otocap.local", "nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(session.current_user().is_none());

        let err = session.sign_in("  ", "x").await.unwrap_err();
        assert_eq!(err.field(), Some("email"));
    }

    #[tokio::test]
    async fn unsubscribe_releases_the_receiver() {
        let session = context();
        let a = session.subscribe();
        let b = session.subscribe();
        assert_eq!(session.subscriber_count(), 2);
        a.unsubscribe();
        drop(b);
        assert_eq!(session.subscriber_count(), 0);
    }
}
