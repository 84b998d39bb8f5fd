//! Projects primary-address changes onto directly-connected route rows.

use config::{AddressFamily, NexthopRow, RouteRow, RouteSource, Store, SubAddressFamily};
use prefix::Family;

use crate::error::Error;

pub struct ConnectedRouteWriter;

impl ConnectedRouteWriter {
    /// Insert one connected route plus its single nexthop for `port_name`'s
    /// primary address `addr_text` in `family`.
    pub fn add_connected_route(
        store: &mut Store,
        port_name: &str,
        addr_text: &str,
        family: Family,
    ) -> Result<(), Error> {
        let vrf = store.first_vrf().ok_or(Error::NoVrf)?;
        let prefix = prefix::canonical_prefix(family, addr_text)?;

        store.insert_route(RouteRow {
            vrf,
            address_family: Some(to_config_family(family)),
            prefix,
            sub_address_family: Some(SubAddressFamily::Unicast),
            from: RouteSource::Connected,
            distance: vec![0],
            selected: vec![true],
            nexthops: vec![NexthopRow {
                ports: vec![port_name.to_string()],
            }],
        });
        Ok(())
    }

    /// Delete the connected route matching `(prefix, port_name, family)`.
    /// A row with `sub_address_family = NULL` matches unicast deletes for
    /// backward compatibility with older rows; `address_family = NULL`
    /// matches only IPv4 deletes, never IPv6.
    pub fn delete_connected_route(
        store: &mut Store,
        addr_text: &str,
        port_name: &str,
        family: Family,
    ) -> Result<(), Error> {
        let vrf = store.first_vrf().ok_or(Error::NoVrf)?;
        let canon_prefix = prefix::canonical_prefix(family, addr_text)?;
        let want_family = to_config_family(family);

        let index = store.routes(vrf).iter().position(|row| {
            let family_matches = match row.address_family {
                None => want_family == AddressFamily::Ipv4,
                Some(f) => f == want_family,
            };
            family_matches
                && row.from == RouteSource::Connected
                && row.prefix == canon_prefix
                && matches!(row.sub_address_family, None | Some(SubAddressFamily::Unicast))
                && row
                    .nexthops
                    .first()
                    .and_then(|nh| nh.ports.first())
                    .is_some_and(|p| p == port_name)
        });

        match index {
            Some(idx) => {
                store.remove_route(vrf, idx);
                Ok(())
            }
            None => Err(Error::RouteNotFound {
                prefix: canon_prefix,
                port: port_name.to_string(),
            }),
        }
    }
}

fn to_config_family(family: Family) -> AddressFamily {
    match family {
        Family::V4 => AddressFamily::Ipv4,
        Family::V6 => AddressFamily::Ipv6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::VrfId;

    fn store_with_vrf() -> Store {
        let mut store = Store::new();
        store.add_vrf(VrfId(0));
        store
    }

    #[test]
    fn add_then_delete_round_trips() {
        let mut store = store_with_vrf();
        ConnectedRouteWriter::add_connected_route(&mut store, "eth0", "10.0.0.5/24", Family::V4)
            .unwrap();
        assert_eq!(store.routes(VrfId(0)).len(), 1);
        assert_eq!(store.routes(VrfId(0))[0].prefix, "10.0.0.0/24");

        ConnectedRouteWriter::delete_connected_route(&mut store, "10.0.0.5/24", "eth0", Family::V4)
            .unwrap();
        assert!(store.routes(VrfId(0)).is_empty());
    }

    #[test]
    fn add_without_vrf_returns_no_vrf() {
        let mut store = Store::new();
        let err = ConnectedRouteWriter::add_connected_route(&mut store, "eth0", "10.0.0.5/24", Family::V4)
            .unwrap_err();
        assert!(matches!(err, Error::NoVrf));
    }

    #[test]
    fn delete_unmatched_row_returns_route_not_found() {
        let mut store = store_with_vrf();
        let err = ConnectedRouteWriter::delete_connected_route(&mut store, "10.0.0.5/24", "eth0", Family::V4)
            .unwrap_err();
        assert!(matches!(err, Error::RouteNotFound { .. }));
    }

    #[test]
    fn delete_matches_null_sub_address_family_as_unicast() {
        let mut store = store_with_vrf();
        store.insert_route(RouteRow {
            vrf: VrfId(0),
            address_family: None,
            prefix: "10.0.0.0/24".to_string(),
            sub_address_family: None,
            from: RouteSource::Connected,
            distance: vec![0],
            selected: vec![true],
            nexthops: vec![NexthopRow {
                ports: vec!["eth0".to_string()],
            }],
        });

        ConnectedRouteWriter::delete_connected_route(&mut store, "10.0.0.5/24", "eth0", Family::V4)
            .unwrap();
        assert!(store.routes(VrfId(0)).is_empty());
    }

    #[test]
    fn delete_with_null_family_never_matches_v6() {
        let mut store = store_with_vrf();
        store.insert_route(RouteRow {
            vrf: VrfId(0),
            address_family: None,
            prefix: "2001:db8::/64".to_string(),
            sub_address_family: None,
            from: RouteSource::Connected,
            distance: vec![0],
            selected: vec![true],
            nexthops: vec![NexthopRow {
                ports: vec!["eth0".to_string()],
            }],
        });

        let err = ConnectedRouteWriter::delete_connected_route(
            &mut store,
            "2001:db8::1/64",
            "eth0",
            Family::V6,
        )
        .unwrap_err();
        assert!(matches!(err, Error::RouteNotFound { .. }));
    }
}
