// MIT License - Copyright (c) 2026 Peter Wright

//! Process-wide map of bridge host to shared session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::config::BridgeConfig;
use crate::session::BridgeSession;

/// Hands out one shared [`BridgeSession`] per bridge host.
///
/// Construct a single registry at startup and pass it to everything that
/// talks to a bridge; entries live as long as the registry. The first
/// caller for a host creates the session, later callers get the same one:
/// one physical connection per bridge, shared by all its devices.
#[derive(Default)]
pub struct BridgeRegistry {
    sessions: Mutex<HashMap<String, Arc<BridgeSession>>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for `host`, created with protocol defaults on first request.
    pub fn get_or_create(&self, host: &str) -> Arc<BridgeSession> {
        self.get_or_create_with(BridgeConfig::builder().host(host).build())
    }

    /// Session for `config.host`, created from `config` on first request.
    ///
    /// The config is ignored when a session for the host already exists.
    pub fn get_or_create_with(&self, config: BridgeConfig) -> Arc<BridgeSession> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(existing) = sessions.get(&config.host) {
            return Arc::clone(existing);
        }
        debug!("Creating session for bridge {}", config.host);
        let host = config.host.clone();
        let session = BridgeSession::new(config);
        sessions.insert(host, Arc::clone(&session));
        session
    }

    /// Existing session for `host`, if one has been created.
    pub fn get(&self, host: &str) -> Option<Arc<BridgeSession>> {
        self.sessions.lock().unwrap().get(host).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_host_shares_session() {
        let registry = BridgeRegistry::new();
        let first = registry.get_or_create("192.168.1.10");
        let second = registry.get_or_create("192.168.1.10");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_distinct_hosts_get_distinct_sessions() {
        let registry = BridgeRegistry::new();
        let first = registry.get_or_create("192.168.1.10");
        let second = registry.get_or_create("192.168.1.11");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.host(), "192.168.1.11");
    }

    #[test]
    fn test_get_only_returns_existing() {
        let registry = BridgeRegistry::new();
        assert!(registry.get("192.168.1.10").is_none());
        let created = registry.get_or_create("192.168.1.10");
        let fetched = registry.get("192.168.1.10").unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
    }
}
