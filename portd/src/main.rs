mod flags;

use std::collections::HashMap;

use clap::Parser;
use config::Store;
use flags::Args;
use kernel::KernelChannel;
use prefix::Family;
use reconcile::StartupReconciler;

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut kernel = match KernelChannel::new() {
        Ok(k) => k,
        Err(e) => {
            log::error!("failed to open kernel control channel: {e}");
            std::process::exit(1);
        }
    };

    if args.enable_ipv4_forwarding {
        if let Err(e) = KernelChannel::set_ip_forwarding(Family::V4, true) {
            log::warn!("failed to enable ipv4 forwarding: {e}");
        }
    }
    if args.enable_ipv6_forwarding {
        if let Err(e) = KernelChannel::set_ip_forwarding(Family::V6, true) {
            log::warn!("failed to enable ipv6 forwarding: {e}");
        }
    }

    // The CONFIG client itself (transactions, row population from the
    // database, change notification) is the host daemon's job; this
    // binary only owns the kernel channel and the reconciliation core.
    let store = Store::new();
    let mut vrf_ports = HashMap::new();
    StartupReconciler::run(&mut kernel, &store, &mut vrf_ports);

    let cached: usize = vrf_ports.values().map(HashMap::len).sum();
    log::info!("startup reconciliation complete, {cached} port(s) cached; awaiting CONFIG changes");

    // The host's main event loop calls ReconfigEngine::reconfigure for
    // each CONFIG change batch from here; that loop lives outside this
    // core.
}
