use std::collections::HashMap;

use tg_rfstate::{LinkKey, RfStateStore};
use tg_types::{is_valid_link_polarity, PolarityType, RadioMac, TopologyView};

use crate::config::{mcs_to_snr, ScanConfig};

/// Per-aggressor-link max-MCS, committed from `relIm` by
/// [`update_max_mcs`] (`spec.md` §4.F.8).
pub type MaxMcsTable = HashMap<LinkKey, u8>;

/// Recomputes `laMaxMcs` for every link with an established steady-state
/// beam, walking every other established link of matching polarity on
/// different endpoints as a candidate victim.
pub fn update_max_mcs(topo: &dyn TopologyView, rfstate: &RfStateStore, cfg: &ScanConfig) -> MaxMcsTable {
    let established: Vec<LinkKey> = topo
        .all_links()
        .into_iter()
        .flat_map(|l| [(l.a_node_mac, l.z_node_mac), (l.z_node_mac, l.a_node_mac)])
        .filter(|key| rfstate.link(key).is_some())
        .collect();

    let mut table = MaxMcsTable::new();
    for &(atx, arx) in &established {
        let Some(agg_offset) = own_link_offset(rfstate, atx, arx) else {
            continue;
        };
        let mut max_mcs = cfg.la_tpc_max_mcs_high;

        for &(vtx, vrx) in &established {
            if vtx == atx || vrx == arx || (vtx, vrx) == (atx, arx) {
                continue;
            }
            if !matching_polarity(topo, atx, vtx) {
                continue;
            }
            let Some(rel) = rfstate.rel_im(&(atx, arx)) else {
                continue;
            };
            let Some(&atx_to_vrx_offset) = rel.routes.get(&(vtx, vrx)) else {
                continue;
            };

            let victim_headroom = rfstate
                .link(&(vtx, vrx))
                .map(|v| (cfg.la_tpc_max_mcs_tx_power_max - v.tx_power).max(0) as f32)
                .unwrap_or(0.0);
            let inr_limit = cfg.la_tpc_max_mcs_inr_limit + cfg.la_tpc_max_mcs_inr_alpha * victim_headroom;

            while max_mcs > cfg.la_tpc_max_mcs_low {
                let target_snr = mcs_to_snr(max_mcs);
                let atx_tx_power = (target_snr - agg_offset).clamp(
                    cfg.la_tpc_max_mcs_tx_power_min as f32,
                    cfg.la_tpc_max_mcs_tx_power_max as f32,
                );
                let inr_estimate = atx_tx_power + atx_to_vrx_offset;
                if inr_estimate <= inr_limit {
                    break;
                }
                max_mcs -= 1;
            }
        }

        table.insert((atx, arx), max_mcs);
    }
    table
}

fn own_link_offset(rfstate: &RfStateStore, tx: RadioMac, rx: RadioMac) -> Option<f32> {
    let link = rfstate.link(&(tx, rx))?;
    let im = rfstate.im(&(tx, rx))?;
    im.routes.get(&(link.tx_beam, link.rx_beam)).copied()
}

fn matching_polarity(topo: &dyn TopologyView, a: RadioMac, b: RadioMac) -> bool {
    is_valid_link_polarity(topo.radio_polarity(&a), topo.radio_polarity(&b))
        || topo.radio_polarity(&a) == Some(PolarityType::Hybrid)
        || topo.radio_polarity(&b) == Some(PolarityType::Hybrid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_rfstate::{RfImData, RfLinkState, RfRelImData, RfStateSnapshot};
    use tg_types::{Link, LinkType, Location, Node, NodeType, Site};

    struct FakeTopo {
        nodes: Vec<Node>,
        links: Vec<Link>,
        polarity: HashMap<RadioMac, PolarityType>,
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
        fn radio_polarity(&self, mac: &RadioMac) -> Option<PolarityType> {
            self.polarity.get(mac).copied()
        }
    }

    fn node(label: &str) -> Node {
        Node {
            name: label.to_string(),
            node_type: NodeType::Dn,
            site_name: format!("s{label}"),
            wlan_mac_addrs: vec![RadioMac::test_mac(label)],
        }
    }

    #[test]
    fn decrements_mcs_when_interference_exceeds_limit() {
        let mac = RadioMac::test_mac;
        let topo = FakeTopo {
            nodes: vec![node("A"), node("B"), node("C"), node("D")],
            links: vec![
                Link { name: "agg".into(), link_type: LinkType::Wireless, a_node_mac: mac("A"), z_node_mac: mac("B") },
                Link { name: "vic".into(), link_type: LinkType::Wireless, a_node_mac: mac("C"), z_node_mac: mac("D") },
            ],
            polarity: HashMap::from([
                (mac("A"), PolarityType::Odd),
                (mac("B"), PolarityType::Even),
                (mac("C"), PolarityType::Odd),
                (mac("D"), PolarityType::Even),
            ]),
        };

        let mut store = RfStateStore::new();
        let mut im_ab = RfImData::new(1, 10);
        im_ab.routes.insert((0, 0), -5.0); // aggressor's own link pathloss offset
        let mut rel_ab = RfRelImData::new(1, 10);
        rel_ab.routes.insert((mac("C"), mac("D")), 40.0); // strong interference into victim
        store.load_snapshot(RfStateSnapshot {
            link: vec![
                ((mac("A"), mac("B")), RfLinkState { tx_beam: 0, rx_beam: 0, tx_power: 10 }),
                ((mac("C"), mac("D")), RfLinkState { tx_beam: 0, rx_beam: 0, tx_power: 10 }),
            ],
            im: vec![((mac("A"), mac("B")), im_ab)],
            rel_im: vec![((mac("A"), mac("B")), rel_ab)],
        });

        let cfg = ScanConfig::default();
        let table = update_max_mcs(&topo, &store, &cfg);
        let max_mcs_ab = table[&(mac("A"), mac("B"))];
        assert!(max_mcs_ab < cfg.la_tpc_max_mcs_high);
        assert!(max_mcs_ab >= cfg.la_tpc_max_mcs_low);
    }
}
