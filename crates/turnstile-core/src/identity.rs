use std::fmt;
use std::net::IpAddr;

/// Identity under which admission decisions are made
///
/// Guests are keyed by caller IP, tenants by account id. The two render
/// into disjoint key namespaces so their quota buckets can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// Unauthenticated caller, identified by source address
    Guest(IpAddr),
    /// Authenticated tenant account
    Tenant(String),
}

impl IdentityKey {
    /// Namespaced storage key for this identity
    pub fn storage_key(&self) -> String {
        match self {
            Self::Guest(ip) => format!("guest:{ip}"),
            Self::Tenant(id) => format!("tenant:{id}"),
        }
    }

    /// Whether this identity is an unauthenticated guest
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
