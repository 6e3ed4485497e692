//! Host ports taken on a node (real or simulated).

use crate::core::pod::HostPort;

fn is_wildcard(ip: &str) -> bool {
    ip.is_empty() || ip == "0.0.0.0" || ip == "::"
}

/// Two bindings conflict on the same port and protocol when either binds every address or both
/// bind the same one.
fn conflicts(a: &HostPort, b: &HostPort) -> bool {
    a.port == b.port
        && a.protocol == b.protocol
        && (is_wildcard(&a.ip) || is_wildcard(&b.ip) || a.ip == b.ip)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostPortUsage {
    reserved: Vec<HostPort>,
}

impl HostPortUsage {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_ports<'a>(ports: impl IntoIterator<Item = &'a HostPort>) -> Self {
        let mut usage = Self::new();
        usage.add(ports);
        usage
    }

    /// Returns description of the first conflicting port, if any.
    pub fn conflicts(&self, ports: &[HostPort]) -> Result<(), String> {
        for port in ports.iter() {
            if let Some(taken) = self.reserved.iter().find(|taken| conflicts(taken, port)) {
                return Err(format!(
                    "{:?}/{}:{} conflicts with {:?}",
                    port.protocol, port.ip, port.port, taken
                ));
            }
        }
        // Ports of one pod may not collide with each other either.
        for (i, port) in ports.iter().enumerate() {
            if ports[i + 1..].iter().any(|other| conflicts(port, other)) {
                return Err(format!(
                    "{:?}/{}:{} requested twice",
                    port.protocol, port.ip, port.port
                ));
            }
        }
        Ok(())
    }

    pub fn add<'a>(&mut self, ports: impl IntoIterator<Item = &'a HostPort>) {
        self.reserved.extend(ports.into_iter().cloned());
    }
}
