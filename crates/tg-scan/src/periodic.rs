use std::collections::HashSet;

use tg_topology::ColorScheduler;
use tg_types::{NodeType, RadioMac, TopologyView};

/// The IM scan loop's per-radio target set (`spec.md` §4.F.5): hearability
/// neighbors, augmented with the full adjacency-neighbor set whenever the
/// radio itself or one of its hearability neighbors is a CN (client node),
/// minus the radio itself.
pub fn im_scan_targets(colorer: &ColorScheduler, topo: &dyn TopologyView, radio: RadioMac) -> Vec<RadioMac> {
    let is_cn = |m: &RadioMac| {
        topo.node_by_mac(m)
            .map(|n| n.node_type == NodeType::Cn)
            .unwrap_or(false)
    };

    let mut targets: HashSet<RadioMac> = colorer.hearability_neighbors(&radio).into_iter().collect();
    if is_cn(&radio) {
        targets.extend(colorer.adjacency_neighbors(&radio));
    }
    for neighbor in targets.clone() {
        if is_cn(&neighbor) {
            targets.extend(colorer.adjacency_neighbors(&neighbor));
        }
    }
    targets.remove(&radio);
    targets.into_iter().collect()
}

/// One color class's worth of IM scan work: `(tx, rxs)` pairs to launch,
/// skipping radios with no remaining targets.
pub fn im_scan_plan_for_group(colorer: &ColorScheduler, topo: &dyn TopologyView, group: &[RadioMac]) -> Vec<(RadioMac, Vec<RadioMac>)> {
    group
        .iter()
        .filter_map(|&radio| {
            let targets = im_scan_targets(colorer, topo, radio);
            (!targets.is_empty()).then_some((radio, targets))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_types::{Link, LinkType, Location, Node, PolarityType, Site};

    struct FakeTopo {
        nodes: Vec<Node>,
        links: Vec<Link>,
    }

    impl TopologyView for FakeTopo {
        fn all_nodes(&self) -> Vec<Node> {
            self.nodes.clone()
        }
        fn all_links(&self) -> Vec<Link> {
            self.links.clone()
        }
        fn node_by_mac(&self, mac: &RadioMac) -> Option<Node> {
            self.nodes.iter().find(|n| n.wlan_mac_addrs.contains(mac)).cloned()
        }
        fn site(&self, name: &str) -> Option<Site> {
            Some(Site { name: name.to_string(), location: Location { latitude: 0.0, longitude: 0.0 } })
        }
        fn radio_polarity(&self, _mac: &RadioMac) -> Option<PolarityType> {
            None
        }
    }

    fn node(label: &str, node_type: tg_types::NodeType) -> Node {
        Node {
            name: label.to_string(),
            node_type,
            site_name: format!("s{label}"),
            wlan_mac_addrs: vec![RadioMac::test_mac(label)],
        }
    }

    #[test]
    fn non_cn_radio_with_no_hearability_neighbors_has_no_targets() {
        let mac = RadioMac::test_mac;
        let topo = FakeTopo {
            nodes: vec![node("A", tg_types::NodeType::Dn), node("B", tg_types::NodeType::Dn)],
            links: vec![Link {
                name: "ab".into(),
                link_type: LinkType::Wireless,
                a_node_mac: mac("A"),
                z_node_mac: mac("B"),
            }],
        };
        // Zero hearability radius: every site reports the same (0, 0)
        // location in this fake, so only a radius of exactly zero yields no
        // hearability edges at all.
        let colorer = ColorScheduler::build(&topo, 0.0);
        assert!(im_scan_targets(&colorer, &topo, mac("B")).is_empty());
    }

    #[test]
    fn cn_radio_pulls_in_its_own_adjacency_neighbors() {
        let mac = RadioMac::test_mac;
        // DN "A" -- CN "B" -- DN "C", no hearability edges (radius zero).
        let topo = FakeTopo {
            nodes: vec![
                node("A", tg_types::NodeType::Dn),
                node("B", tg_types::NodeType::Cn),
                node("C", tg_types::NodeType::Dn),
            ],
            links: vec![
                Link { name: "ab".into(), link_type: LinkType::Wireless, a_node_mac: mac("A"), z_node_mac: mac("B") },
                Link { name: "bc".into(), link_type: LinkType::Wireless, a_node_mac: mac("B"), z_node_mac: mac("C") },
            ],
        };
        let colorer = ColorScheduler::build(&topo, 0.0);
        let targets = im_scan_targets(&colorer, &topo, mac("B"));
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&mac("A")));
        assert!(targets.contains(&mac("C")));
    }
}
