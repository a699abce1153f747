//! Session registry: observers keyed per tenant and per driver.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use fleetpulse_core::types::ObserverId;

use super::session::ObserverSession;
use super::topic::WatchTopic;

/// Registry of all attached observers.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Topic → (observer → session).
    topics: DashMap<WatchTopic, HashMap<ObserverId, Arc<ObserverSession>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under a topic.
    pub fn register(&self, topic: WatchTopic, session: Arc<ObserverSession>) {
        self.topics
            .entry(topic)
            .or_default()
            .insert(session.id, session);
    }

    /// Removes a session from a topic and returns it. Removing an unknown
    /// session is a no-op.
    pub fn unregister(
        &self,
        topic: WatchTopic,
        observer_id: ObserverId,
    ) -> Option<Arc<ObserverSession>> {
        let removed = self
            .topics
            .get_mut(&topic)
            .and_then(|mut sessions| sessions.remove(&observer_id));
        self.topics.remove_if(&topic, |_, sessions| sessions.is_empty());
        removed
    }

    /// Snapshot of the sessions registered under a topic.
    pub fn observers(&self, topic: WatchTopic) -> Vec<Arc<ObserverSession>> {
        self.topics
            .get(&topic)
            .map(|sessions| sessions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns whether the topic has at least one session.
    pub fn has_observers(&self, topic: WatchTopic) -> bool {
        self.topics
            .get(&topic)
            .is_some_and(|sessions| !sessions.is_empty())
    }

    /// Returns the session count for a topic.
    pub fn observer_count(&self, topic: WatchTopic) -> usize {
        self.topics.get(&topic).map(|s| s.len()).unwrap_or(0)
    }

    /// Returns the total number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.topics.iter().map(|entry| entry.value().len()).sum()
    }

    /// Removes and returns every session.
    pub fn drain(&self) -> Vec<Arc<ObserverSession>> {
        let topics: Vec<WatchTopic> = self.topics.iter().map(|e| *e.key()).collect();
        topics
            .into_iter()
            .filter_map(|topic| self.topics.remove(&topic))
            .flat_map(|(_, sessions)| sessions.into_values())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use fleetpulse_core::types::{DriverId, TenantId};

    use super::*;
    use crate::observer::ChannelObserver;

    fn session(tenant: TenantId, driver: Option<DriverId>) -> Arc<ObserverSession> {
        let (sink, _rx) = ChannelObserver::new(4);
        Arc::new(ObserverSession::new(tenant, driver, None, sink))
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = SessionRegistry::new();
        let tenant = TenantId::new();
        let s = session(tenant, None);
        let topic = WatchTopic::Tenant(tenant);

        registry.register(topic, s.clone());
        assert!(registry.has_observers(topic));
        assert_eq!(registry.observers(topic).len(), 1);

        assert!(registry.unregister(topic, s.id).is_some());
        assert!(registry.unregister(topic, s.id).is_none());
        assert!(!registry.has_observers(topic));
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn test_topics_are_isolated() {
        let registry = SessionRegistry::new();
        let tenant = TenantId::new();
        let driver = DriverId::new();
        registry.register(WatchTopic::Tenant(tenant), session(tenant, None));
        registry.register(WatchTopic::Driver(driver), session(tenant, Some(driver)));
        registry.register(WatchTopic::Driver(driver), session(tenant, Some(driver)));

        assert_eq!(registry.observer_count(WatchTopic::Tenant(tenant)), 1);
        assert_eq!(registry.observer_count(WatchTopic::Driver(driver)), 2);
        assert_eq!(registry.observer_count(WatchTopic::Tenant(TenantId::new())), 0);
        assert_eq!(registry.session_count(), 3);

        assert_eq!(registry.drain().len(), 3);
        assert_eq!(registry.session_count(), 0);
    }
}
