use crate::collectors::command::run_bounded;
use crate::collectors::{into_reading, CollectError};
use crate::config::CommandConfig;
use crate::state::{InterfaceKind, NetInterface, Reading, Severity};

pub async fn collect_interfaces(cfg: &CommandConfig) -> Reading<Vec<NetInterface>> {
    into_reading("interfaces", read_interfaces(cfg).await)
}

async fn read_interfaces(cfg: &CommandConfig) -> Result<(Vec<NetInterface>, Severity), CollectError> {
    let stdout = run_bounded(cfg).await?;
    let interfaces = parse_ip_addr(&stdout);
    let severity = if interfaces.is_empty() {
        Severity::Elevated
    } else {
        Severity::Normal
    };
    Ok((interfaces, severity))
}

pub fn parse_ip_addr(stdout: &str) -> Vec<NetInterface> {
    let mut out: Vec<NetInterface> = Vec::new();

    for line in stdout.lines() {
        if !line.starts_with(char::is_whitespace) {
            let mut tokens = line.split_whitespace();
            let index = tokens.next().unwrap_or_default();
            let is_header = index
                .strip_suffix(':')
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
            let Some(raw_name) = tokens.next().filter(|_| is_header) else {
                continue;
            };
            let name = raw_name
                .trim_end_matches(':')
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string();
            out.push(NetInterface {
                kind: interface_kind(&name),
                name,
                addresses: Vec::new(),
            });
            continue;
        }

        let mut tokens = line.split_whitespace();
        if !matches!(tokens.next(), Some("inet") | Some("inet6")) {
            continue;
        }
        let (Some(current), Some(cidr)) = (out.last_mut(), tokens.next()) else {
            continue;
        };
        let addr = cidr.split('/').next().unwrap_or(cidr);
        current.addresses.push(addr.to_string());
    }

    out
}

pub fn interface_kind(name: &str) -> InterfaceKind {
    if name == "lo" {
        InterfaceKind::Loopback
    } else if name.starts_with("eth") || name.starts_with("en") {
        InterfaceKind::Ethernet
    } else if name.starts_with("wlan") || name.starts_with("wl") {
        InterfaceKind::Wireless
    } else {
        InterfaceKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 qdisc noqueue state UNKNOWN group default qlen 1000
    link/loopback 00:00:00:00:00:00 brd 00:00:00:00:00:00
    inet 127.0.0.1/8 scope host lo
       valid_lft forever preferred_lft forever
    inet6 ::1/128 scope host
       valid_lft forever preferred_lft forever
2: eth0: <NO-CARRIER,BROADCAST,MULTICAST,UP> mtu 1500 qdisc mq state DOWN group default qlen 1000
    link/ether b8:27:eb:00:00:01 brd ff:ff:ff:ff:ff:ff
3: wlan0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc pfifo_fast state UP group default qlen 1000
    link/ether b8:27:eb:00:00:02 brd ff:ff:ff:ff:ff:ff
    inet 192.168.1.42/24 brd 192.168.1.255 scope global dynamic noprefixroute wlan0
       valid_lft 85000sec preferred_lft 85000sec
12: veth1a2b@if11: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc noqueue master docker0
    inet 172.17.0.1/16 brd 172.17.255.255 scope global docker0
";

    #[test]
    fn parses_interfaces_and_addresses() {
        let ifaces = parse_ip_addr(SAMPLE);
        let names: Vec<&str> = ifaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["lo", "eth0", "wlan0", "veth1a2b"]);

        assert_eq!(ifaces[0].kind, InterfaceKind::Loopback);
        assert_eq!(ifaces[0].addresses, ["127.0.0.1", "::1"]);
        assert_eq!(ifaces[1].kind, InterfaceKind::Ethernet);
        assert!(ifaces[1].addresses.is_empty());
        assert_eq!(ifaces[2].kind, InterfaceKind::Wireless);
        assert_eq!(ifaces[2].addresses, ["192.168.1.42"]);
        assert_eq!(ifaces[3].kind, InterfaceKind::Other);
    }

    #[test]
    fn empty_output_has_no_interfaces() {
        assert!(parse_ip_addr("").is_empty());
        assert!(parse_ip_addr("    inet 10.0.0.1/8\n").is_empty());
    }

    #[test]
    fn predictable_names_are_classified() {
        assert_eq!(interface_kind("enp3s0"), InterfaceKind::Ethernet);
        assert_eq!(interface_kind("wlp2s0"), InterfaceKind::Wireless);
        assert_eq!(interface_kind("docker0"), InterfaceKind::Other);
    }
}
