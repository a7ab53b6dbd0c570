//! The admission predicate: may this identity, from this address, connect?

use lodestone_protocol::PlayerIdentity;

use crate::AccessControlSets;

/// Why a connection attempt was refused. The `Display` text is what the
/// client is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("You are banned from this server.")]
    Banned,
    #[error("Your IP address is banned from this server.")]
    IpBanned,
    #[error("You are not white-listed on this server!")]
    NotWhitelisted,
    #[error("The server is full!")]
    ServerFull,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Denied(DenyReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

impl AccessControlSets {
    /// Checks the access lists, in this order:
    ///
    /// 1. identity ban → [`DenyReason::Banned`]
    /// 2. address ban → [`DenyReason::IpBanned`]
    /// 3. whitelist (only when enabled; operators bypass it) →
    ///    [`DenyReason::NotWhitelisted`]
    ///
    /// The player cap is not known here; the server checks it afterwards.
    /// Pure: callable from any thread, before a session exists.
    pub fn check_admission(&self, identity: &PlayerIdentity, address: &str) -> Admission {
        if self.is_banned(identity) {
            return Admission::Denied(DenyReason::Banned);
        }
        if self.is_ip_banned(address) {
            return Admission::Denied(DenyReason::IpBanned);
        }
        let whitelist = self.whitelist();
        if whitelist.is_enabled() && !whitelist.contains(identity) && !self.is_op(identity) {
            return Admission::Denied(DenyReason::NotWhitelisted);
        }
        Admission::Admitted
    }
}
