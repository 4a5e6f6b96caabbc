use std::sync::Arc;

use crate::Result;
use crate::bridge::{EventBridge, SubscriptionToken};
use crate::provider::{ListenerId, Provider, Scope};

/// A live registration with the provider, released on drop.
///
/// After [`Subscription::cancel`] returns, nothing published through this
/// subscription is drained from the bridge again.
pub struct Subscription {
    provider: Arc<dyn Provider>,
    scope: Scope,
    token: Arc<SubscriptionToken>,
    listener: Option<ListenerId>,
}

impl Subscription {
    pub fn open(provider: Arc<dyn Provider>, scope: Scope, bridge: &EventBridge) -> Result<Self> {
        let publisher = bridge.publisher();
        let token = publisher.token();

        match provider.subscribe(&scope, publisher) {
            Ok(listener) => {
                tracing::debug!(%scope, subscription = token.id(), "subscribed");
                Ok(Self {
                    provider,
                    scope,
                    token,
                    listener: Some(listener),
                })
            }
            Err(e) => {
                token.cancel();
                Err(e)
            }
        }
    }

    /// Idempotent.
    pub fn cancel(&mut self) {
        if !self.token.cancel() {
            return;
        }
        if let Some(listener) = self.listener.take() {
            self.provider.unsubscribe(listener);
        }
        tracing::debug!(scope = %self.scope, subscription = self.token.id(), "subscription released");
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
