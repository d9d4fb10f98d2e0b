use std::net::{IpAddr, Ipv4Addr};
use std::process::Command;

// only used to pick the outgoing route, nothing is sent
const PROBE_DESTINATION: &str = "1.1.1.1";

/// Source address the kernel would use for outbound traffic.
pub fn detect() -> Option<IpAddr> {
    let output = match Command::new("ip")
        .arg("-4")
        .arg("route")
        .arg("get")
        .arg(PROBE_DESTINATION)
        .output()
    {
        Ok(output) => output,
        Err(err) => {
            tracing::warn!(?err, "ip -4 route get {} failed", PROBE_DESTINATION);
            return None;
        }
    };

    if !output.status.success() {
        tracing::warn!(
            stderr = String::from_utf8_lossy(&output.stderr).to_string(),
            "ip -4 route get failed"
        );
        return None;
    }

    let ip = source_address(&String::from_utf8_lossy(&output.stdout));
    if ip.is_none() {
        tracing::warn!("no source address in ip route output");
    }
    ip.map(IpAddr::V4)
}

fn source_address(route: &str) -> Option<Ipv4Addr> {
    route
        .split_whitespace()
        .skip_while(|token| *token != "src")
        .nth(1)
        .and_then(|ip| ip.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_address() {
        let out = "1.1.1.1 via 192.168.1.1 dev eth0 src 192.168.1.10 uid 0 \n    cache \n";
        assert_eq!(source_address(out), Some(Ipv4Addr::new(192, 168, 1, 10)));
        assert_eq!(source_address("1.1.1.1 dev wg0 table 51820 uid 0"), None);
        assert_eq!(source_address(""), None);
    }
}
