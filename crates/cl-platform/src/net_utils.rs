use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use local_ip_address::list_afinet_netifas;
use tracing::{debug, warn};

/// Detect the physical LAN IPv4 address of this machine.
///
/// 检测本机的物理局域网 IPv4 地址。
///
/// Skips loopback, link-local, tunnel interfaces (utun, tun, tap), the
/// 198.18.0.0/15 range used by TUN proxies, and anything outside the
/// private ranges.
pub fn get_physical_lan_ip() -> Option<Ipv4Addr> {
    let interfaces = match list_afinet_netifas() {
        Ok(ifaces) => ifaces,
        Err(e) => {
            warn!(error = %e, "failed to enumerate network interfaces");
            return None;
        }
    };

    let found = interfaces.into_iter().find_map(|(iface, ip)| match ip {
        IpAddr::V4(v4) if is_lan_candidate(&iface, v4) => Some((iface, v4)),
        _ => None,
    });

    match found {
        Some((iface, ip)) => {
            debug!(%ip, interface = %iface, "detected physical LAN IP");
            Some(ip)
        }
        None => {
            warn!("no suitable physical LAN IP found");
            None
        }
    }
}

/// Address peers can reach us at.
///
/// A wildcard bind (`0.0.0.0:port`) is reported with the detected LAN IP;
/// specific binds are returned unchanged.
pub fn advertised_address(bound: SocketAddr) -> SocketAddr {
    if !bound.ip().is_unspecified() {
        return bound;
    }
    match get_physical_lan_ip() {
        Some(ip) => SocketAddr::new(IpAddr::V4(ip), bound.port()),
        None => bound,
    }
}

fn is_lan_candidate(iface: &str, ip: Ipv4Addr) -> bool {
    if ip.is_loopback() || ip.is_link_local() {
        return false;
    }
    if ["utun", "tun", "tap"].iter().any(|t| iface.contains(t)) {
        return false;
    }
    let [a, b, ..] = ip.octets();
    if a == 198 && (18..=19).contains(&b) {
        return false;
    }
    ip.is_private()
}
