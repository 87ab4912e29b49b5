use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tg_types::{Link, LinkType, RadioMac, ScanType, TopologyView};

use crate::config::ScanConfig;

/// A single aux (aggressor-or-victim) candidate considered for a main
/// link's CBF scan, with the INR estimate that drove its inclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CbfAuxCandidate {
    pub aux_tx: RadioMac,
    pub aux_rx: RadioMac,
    pub inr_db: f32,
    /// `true` when `inr_db` cleared `cbf_inr_thresh_nulling`, i.e. this aux
    /// is a genuine nulling target rather than only included for the
    /// measurement set (`cbf_inr_thresh_aux_set`).
    pub is_nulling_candidate: bool,
    pub aux_tx_pwr_index: Option<i16>,
}

/// A CBF scan the orchestrator should launch for one main link, stored
/// under the key `"<ScanType>-<mainTx>-<mainRx>"` per `spec.md` §4.F.6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CbfScanPlan {
    pub scan_type: ScanType,
    pub main_tx: RadioMac,
    pub main_rx: RadioMac,
    pub main_tx_pwr_index: Option<i16>,
    pub aux: Vec<CbfAuxCandidate>,
}

impl CbfScanPlan {
    pub fn key(&self) -> String {
        format!("{:?}-{}-{}", self.scan_type, self.main_tx, self.main_rx)
    }
}

fn same_site(topo: &dyn TopologyView, a: RadioMac, b: RadioMac) -> bool {
    match (topo.node_by_mac(&a), topo.node_by_mac(&b)) {
        (Some(na), Some(nb)) => na.site_name == nb.site_name,
        _ => false,
    }
}

/// Generates the CBF scan plan for every wireless link, per `spec.md`
/// §4.F.6. `scan_type` selects TX CBF (aux measured against the main
/// link's tx side) or RX CBF (against the rx side).
///
/// The IM route consulted for each aux candidate is looked up at the aux
/// radio's *own* steady-state tx beam crossed with the main link's steady
/// rx beam (RX CBF) or tx beam (TX CBF) — i.e. `rfstate.im(aux_tx, main_rx)`
/// indexed by `(aux_link.tx_beam, main_link.rx_beam)`. `spec.md`'s IM data
/// is keyed by arbitrary radio pairs, not just topology-adjacent ones, so
/// this lookup is exactly "the IM route for aux→victim at the current
/// beams" the spec calls for.
pub fn generate_cbf_config(
    topo: &dyn TopologyView,
    rfstate: &tg_rfstate::RfStateStore,
    cfg: &ScanConfig,
    scan_type: ScanType,
) -> Vec<CbfScanPlan> {
    let links: Vec<Link> = topo
        .all_links()
        .into_iter()
        .filter(|l| l.link_type == LinkType::Wireless)
        .collect();

    let mut plans = Vec::new();
    for main in &links {
        for (main_tx, main_rx) in [
            (main.a_node_mac, main.z_node_mac),
            (main.z_node_mac, main.a_node_mac),
        ] {
            let Some(main_state) = rfstate.link(&(main_tx, main_rx)) else {
                continue;
            };

            let mut by_aux_node: HashMap<RadioMac, Vec<CbfAuxCandidate>> = HashMap::new();
            for aux in &links {
                for (aux_tx, aux_rx) in [
                    (aux.a_node_mac, aux.z_node_mac),
                    (aux.z_node_mac, aux.a_node_mac),
                ] {
                    if aux_tx == main_tx && aux_rx == main_rx {
                        continue;
                    }
                    let exclusion_anchor = match scan_type {
                        ScanType::CbfRx => main_tx,
                        _ => main_rx,
                    };
                    if !cfg.cbf_allow_same_site_aux && same_site(topo, exclusion_anchor, aux_tx) {
                        continue;
                    }
                    let Some(aux_state) = rfstate.link(&(aux_tx, aux_rx)) else {
                        continue;
                    };
                    let (route_tx, route_rx, aux_radio_for_route) = match scan_type {
                        ScanType::CbfRx => (aux_tx, main_rx, aux_tx),
                        _ => (main_tx, aux_rx, aux_rx),
                    };
                    let Some(im) = rfstate.im(&(route_tx, route_rx)) else {
                        continue;
                    };
                    let beam_key = match scan_type {
                        ScanType::CbfRx => (aux_state.tx_beam, main_state.rx_beam),
                        _ => (main_state.tx_beam, aux_state.rx_beam),
                    };
                    let Some(&offset_db) = im.routes.get(&beam_key) else {
                        continue;
                    };
                    let inr_db = offset_db + aux_state.tx_power as f32;
                    if inr_db <= cfg.cbf_inr_thresh_aux_set {
                        continue;
                    }
                    let candidate = CbfAuxCandidate {
                        aux_tx,
                        aux_rx,
                        inr_db,
                        is_nulling_candidate: inr_db > cfg.cbf_inr_thresh_nulling,
                        aux_tx_pwr_index: Some(aux_state.tx_power),
                    };
                    by_aux_node
                        .entry(aux_radio_for_route)
                        .or_default()
                        .push(candidate);
                }
            }

            let mut aux: Vec<CbfAuxCandidate> = by_aux_node
                .into_values()
                .filter_map(|mut candidates| {
                    candidates.sort_by(|a, b| b.inr_db.partial_cmp(&a.inr_db).unwrap());
                    candidates.into_iter().next()
                })
                .collect();
            if aux.is_empty() {
                continue;
            }
            aux.sort_by(|a, b| b.inr_db.partial_cmp(&a.inr_db).unwrap());

            let main_tx_pwr_index = if scan_type == ScanType::CbfRx {
                assign_rx_cbf_power(main_state.tx_power, cfg, &mut aux)
            } else {
                None
            };

            plans.push(CbfScanPlan {
                scan_type,
                main_tx,
                main_rx,
                main_tx_pwr_index,
                aux,
            });
        }
    }
    plans
}

/// Power assignment for RX CBF (`spec.md` §4.F.6 step 5): clamps the
/// main link's scan-time tx power to hit `cbf_target_snr`, derives a
/// shared target INR bounded by `cbf_min_target_sir` below the main
/// link's SNR, and sets each aux's scan-time power to the offset that
/// would produce that target INR (clamped to `[1, cbf_max_tx_pwr]`).
///
/// Preserves the open-question saturation fallback from `spec.md` §9(d):
/// when the computed main tx power would need to exceed
/// `cbf_max_tx_pwr`, the excess is folded only into the *first* (primary,
/// strongest-INR) aux's power rather than redistributed across all aux
/// candidates.
fn assign_rx_cbf_power(main_tx_power: i16, cfg: &ScanConfig, aux: &mut [CbfAuxCandidate]) -> Option<i16> {
    let main_offset_db = 0.0_f32; // pathloss offset folded into IM data already.
    let raw_main_tx_pwr = cfg.cbf_target_snr - main_offset_db;
    let main_tx_pwr = raw_main_tx_pwr.clamp(1.0, cfg.cbf_max_tx_pwr as f32);
    let saturation = raw_main_tx_pwr - main_tx_pwr;

    let main_snr = cfg.cbf_target_snr;
    let target_inr = cfg.cbf_target_inr.min(main_snr - cfg.cbf_min_target_sir);

    for (i, candidate) in aux.iter_mut().enumerate() {
        let trx_offset = candidate.inr_db - candidate.aux_tx_pwr_index.unwrap_or(0) as f32;
        let mut pwr = target_inr - trx_offset;
        if i == 0 {
            pwr -= saturation;
        }
        candidate.aux_tx_pwr_index = Some(pwr.clamp(1.0, cfg.cbf_max_tx_pwr as f32).round() as i16);
    }

    Some(main_tx_pwr.round() as i16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_rfstate::RfStateStore;
    use tg_types::{Location, Node, NodeType, PolarityType, Site};

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
            Some(Site {
                name: name.to_string(),
                location: Location { latitude: 0.0, longitude: 0.0 },
            })
        }
        fn radio_polarity(&self, _mac: &RadioMac) -> Option<PolarityType> {
            None
        }
    }

    #[test]
    fn below_threshold_candidates_are_excluded() {
        let mac = RadioMac::test_mac;
        let topo = FakeTopo {
            nodes: vec![
                Node { name: "a".into(), node_type: NodeType::Dn, site_name: "sa".into(), wlan_mac_addrs: vec![mac("A")] },
                Node { name: "b".into(), node_type: NodeType::Dn, site_name: "sb".into(), wlan_mac_addrs: vec![mac("B")] },
                Node { name: "c".into(), node_type: NodeType::Dn, site_name: "sc".into(), wlan_mac_addrs: vec![mac("C")] },
                Node { name: "d".into(), node_type: NodeType::Dn, site_name: "sd".into(), wlan_mac_addrs: vec![mac("D")] },
            ],
            links: vec![
                Link { name: "main".into(), link_type: LinkType::Wireless, a_node_mac: mac("A"), z_node_mac: mac("B") },
                Link { name: "aux".into(), link_type: LinkType::Wireless, a_node_mac: mac("C"), z_node_mac: mac("D") },
            ],
        };

        let mut store = RfStateStore::new();
        store.load_snapshot(tg_rfstate::RfStateSnapshot {
            link: vec![
                ((mac("A"), mac("B")), tg_rfstate::RfLinkState { tx_beam: 0, rx_beam: 0, tx_power: 10 }),
                ((mac("C"), mac("D")), tg_rfstate::RfLinkState { tx_beam: 0, rx_beam: 0, tx_power: 10 }),
            ],
            im: vec![],
            rel_im: vec![],
        });

        let cfg = ScanConfig::default();
        let plans = generate_cbf_config(&topo, &store, &cfg, ScanType::CbfRx);
        // No IM route recorded for (C, B): nothing should be generated.
        assert!(plans.is_empty());
    }
}
