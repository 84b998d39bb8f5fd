use clap::Parser;

/// L3 address-and-route reconciliation core for the port-management
/// daemon.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Enable IPv4 forwarding via /proc/sys/net/ipv4/ip_forward at startup.
    #[arg(long)]
    pub enable_ipv4_forwarding: bool,

    /// Enable IPv6 forwarding via /proc/sys/net/ipv6/conf/all/forwarding.
    #[arg(long)]
    pub enable_ipv6_forwarding: bool,
}
