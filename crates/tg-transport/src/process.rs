use crate::error::TransportError;

/// Spawns and kills the per-interface wsec helper processes (hostapd-style
/// authenticator, wpa_supplicant-style supplicant) the ignition state
/// machine drives. Actual process management is an external collaborator;
/// this crate only specifies the contract.
pub trait ProcessSpawner: Send + Sync {
    fn start_authenticator(&self, ifname: &str) -> Result<(), TransportError>;
    fn kill_authenticator(&self, ifname: &str);
    fn start_supplicant(&self, ifname: &str) -> Result<(), TransportError>;
    fn kill_supplicant(&self, ifname: &str);
}
