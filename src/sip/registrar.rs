//! Registrar: the process-wide AOR binding table
//!
//! Maps an address-of-record to the contact and transport it registered
//! from. Every forwarding path reads it; REGISTER handling mutates it.
//! Expiry is absolute wall-clock and observed lazily: the lookup that sees
//! a stale entry removes it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// A registered endpoint: where an AOR is currently reachable and the
/// listener socket its traffic must leave through.
#[derive(Clone)]
pub struct Binding {
    /// Contact `host[:port]` as registered
    pub contact: String,
    /// Socket the REGISTER arrived on; authoritative reply transport
    pub handle: Arc<UdpSocket>,
    /// Source address of the registering datagram
    pub addr: SocketAddr,
    /// Absolute Unix second after which this binding is invalid
    pub expires_at: u64,
}

#[derive(Default)]
pub struct Registrar {
    bindings: Mutex<HashMap<String, Binding>>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current wall-clock time in whole seconds since the Unix epoch.
    pub fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Binding>> {
        // A poisoned lock only means another handler panicked; the table
        // itself is still usable.
        self.bindings.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or overwrite the binding for an AOR.
    pub fn register(&self, aor: &str, contact: &str, handle: Arc<UdpSocket>, addr: SocketAddr, expires_at: u64) {
        self.table().insert(
            aor.to_string(),
            Binding { contact: contact.to_string(), handle, addr, expires_at },
        );
    }

    /// Remove the binding for an AOR; absent keys are tolerated.
    pub fn deregister(&self, aor: &str) {
        self.table().remove(aor);
    }

    /// Resolve an AOR to its binding. A stale entry (expiry at or before
    /// now) is removed under the same lock and reported absent.
    pub fn lookup(&self, aor: &str) -> Option<Binding> {
        let mut bindings = self.table();
        match bindings.get(aor) {
            Some(binding) if binding.expires_at > Self::now() => Some(binding.clone()),
            Some(_) => {
                bindings.remove(aor);
                warn!("registration for {} has expired", aor);
                None
            }
            None => None,
        }
    }

    /// Same check-and-evict as [`lookup`](Self::lookup), without handing
    /// out the record.
    pub fn is_valid(&self, aor: &str) -> bool {
        self.lookup(aor).is_some()
    }

    /// Whether the AOR has a binding at all, expired or not.
    pub fn contains(&self, aor: &str) -> bool {
        self.table().contains_key(aor)
    }

    /// Dump the table at debug level.
    pub fn debug_dump(&self) {
        let bindings = self.table();
        debug!("*** REGISTRAR ***");
        for (aor, binding) in bindings.iter() {
            debug!("{} -> {}", aor, binding.contact);
        }
        debug!("*****************");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn handle() -> Arc<UdpSocket> {
        Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap())
    }

    fn addr() -> SocketAddr {
        "10.0.0.1:5060".parse().unwrap()
    }

    #[tokio::test]
    async fn test_register_then_lookup() {
        let registrar = Registrar::new();
        registrar.register("alice@example.com", "10.0.0.1:5060", handle().await, addr(), Registrar::now() + 60);

        let binding = registrar.lookup("alice@example.com").expect("registered");
        assert_eq!(binding.contact, "10.0.0.1:5060");
        assert_eq!(binding.addr, addr());
    }

    #[tokio::test]
    async fn test_lookup_unknown_aor() {
        let registrar = Registrar::new();
        assert!(registrar.lookup("nobody@example.com").is_none());
        assert!(!registrar.is_valid("nobody@example.com"));
    }

    #[tokio::test]
    async fn test_deregister_removes_binding() {
        let registrar = Registrar::new();
        registrar.register("alice@example.com", "10.0.0.1", handle().await, addr(), Registrar::now() + 60);
        registrar.deregister("alice@example.com");
        assert!(registrar.lookup("alice@example.com").is_none());

        // absent key is fine
        registrar.deregister("alice@example.com");
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_lookup() {
        let registrar = Registrar::new();
        registrar.register("alice@example.com", "10.0.0.1", handle().await, addr(), Registrar::now() - 1);

        assert!(registrar.lookup("alice@example.com").is_none());
        // the failed lookup must have removed the entry entirely
        assert!(!registrar.contains("alice@example.com"));
    }

    #[tokio::test]
    async fn test_expiry_boundary_is_exclusive() {
        let registrar = Registrar::new();
        // expiry exactly now: already invalid
        registrar.register("alice@example.com", "10.0.0.1", handle().await, addr(), Registrar::now());
        assert!(!registrar.is_valid("alice@example.com"));
    }

    #[tokio::test]
    async fn test_is_valid_evicts_expired() {
        let registrar = Registrar::new();
        registrar.register("bob@example.com", "10.0.0.2", handle().await, addr(), Registrar::now() - 10);
        assert!(!registrar.is_valid("bob@example.com"));
        assert!(!registrar.contains("bob@example.com"));
    }

    #[tokio::test]
    async fn test_reregistration_overwrites() {
        let registrar = Registrar::new();
        let first = handle().await;
        let second = handle().await;
        registrar.register("alice@example.com", "10.0.0.1:5060", first, addr(), Registrar::now() + 60);
        registrar.register(
            "alice@example.com",
            "10.0.0.9:5062",
            second,
            "10.0.0.9:5062".parse().unwrap(),
            Registrar::now() + 120,
        );

        let binding = registrar.lookup("alice@example.com").expect("still registered");
        assert_eq!(binding.contact, "10.0.0.9:5062");
        assert_eq!(binding.addr, "10.0.0.9:5062".parse().unwrap());
    }

    #[tokio::test]
    async fn test_contains_ignores_expiry() {
        let registrar = Registrar::new();
        registrar.register("alice@example.com", "10.0.0.1", handle().await, addr(), Registrar::now() - 1);
        assert!(registrar.contains("alice@example.com"));
    }
}
