//! RF state store: steady-state link beams/power, IM scan aggregates, and
//! relative-IM cross-link offsets feeding CBF config generation and LA/TPC.

mod store;
mod types;

pub use store::{RfStateSnapshot, RfStateStore};
pub use types::{BeamKey, LinkKey, RfImData, RfLinkState, RfRelImData, SCAN_SNR_MIN};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tg_types::{
        Link, LinkType, Location, Node, NodeType, PolarityType, RadioMac, RouteInfo, Scan,
        ScanFwStatus, ScanMode, ScanResp, ScanType, Site, TopologyView,
    };

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
                location: Location {
                    latitude: 0.0,
                    longitude: 0.0,
                },
            })
        }
        fn radio_polarity(&self, _mac: &RadioMac) -> Option<PolarityType> {
            None
        }
    }

    fn mac(l: &str) -> RadioMac {
        RadioMac::test_mac(l)
    }

    fn base_scan(tx: RadioMac, rx: RadioMac) -> Scan {
        Scan {
            scan_id: 1,
            group_id: None,
            scan_type: ScanType::Pbf,
            scan_mode: ScanMode::Fine,
            sub_type: None,
            tx_node: Some(tx),
            rx_nodes: vec![rx],
            start_bwgd: 0,
            apply_bwgd: None,
            apply: None,
            bwgd_len: None,
            beams: None,
            responses: HashMap::new(),
            n_responses_waiting: 0,
            resp_id: None,
            timed_out: false,
        }
    }

    #[test]
    fn s3_im_scan_aggregation() {
        let tx = mac("AA");
        let rx = mac("BB");
        let mut scan = base_scan(tx, rx);
        scan.scan_type = ScanType::Im;

        let mut tx_resp = ScanResp::minimal(1, ScanFwStatus::Complete, 0);
        tx_resp.tx_pwr_index = Some(15);
        scan.responses.insert(tx, tx_resp);

        let mut rx_resp = ScanResp::minimal(1, ScanFwStatus::Complete, 0);
        rx_resp.route_info_list = vec![
            RouteInfo { tx_beam: 0, rx_beam: 0, snr_est: 20.0, packet_idx: 0, sweep_idx: 0 },
            RouteInfo { tx_beam: 0, rx_beam: 0, snr_est: 22.0, packet_idx: 0, sweep_idx: 1 },
            RouteInfo { tx_beam: 1, rx_beam: 0, snr_est: 18.0, packet_idx: 0, sweep_idx: 2 },
        ];
        scan.responses.insert(rx, rx_resp);

        let mut store = RfStateStore::new();
        let updated = store.ingest_im(&scan, false);
        assert_eq!(updated, 1);

        let data = store.im(&(tx, rx)).unwrap();
        assert_eq!(data.best_tx_beam, Some(0));
        assert_eq!(data.best_rx_beam, Some(0));
        assert!((data.routes[&(0i16, 0i16)] - 6.0).abs() < 1e-6);
        assert!((data.routes[&(1i16, 0i16)] - 3.0).abs() < 1e-6);
        assert!(store.is_dirty());
    }

    #[test]
    fn im_ingestion_keeps_stronger_existing_unless_overridden() {
        let tx = mac("AA");
        let rx = mac("BB");
        let mut store = RfStateStore::new();

        let mut strong = base_scan(tx, rx);
        strong.scan_type = ScanType::Im;
        let mut tx_resp = ScanResp::minimal(1, ScanFwStatus::Complete, 0);
        tx_resp.tx_pwr_index = Some(20);
        strong.responses.insert(tx, tx_resp);
        let mut rx_resp = ScanResp::minimal(1, ScanFwStatus::Complete, 0);
        rx_resp.route_info_list = vec![
            RouteInfo { tx_beam: 0, rx_beam: 0, snr_est: 10.0, packet_idx: 0, sweep_idx: 0 },
            RouteInfo { tx_beam: 1, rx_beam: 0, snr_est: 10.0, packet_idx: 0, sweep_idx: 1 },
        ];
        strong.responses.insert(rx, rx_resp);
        store.ingest_im(&strong, false);

        let mut weak = base_scan(tx, rx);
        weak.scan_type = ScanType::Im;
        let mut tx_resp2 = ScanResp::minimal(2, ScanFwStatus::Complete, 0);
        tx_resp2.tx_pwr_index = Some(5);
        weak.responses.insert(tx, tx_resp2);
        let mut rx_resp2 = ScanResp::minimal(2, ScanFwStatus::Complete, 0);
        rx_resp2.route_info_list = vec![RouteInfo {
            tx_beam: 0,
            rx_beam: 0,
            snr_est: 10.0,
            packet_idx: 0,
            sweep_idx: 0,
        }];
        weak.responses.insert(rx, rx_resp2);

        let updated = store.ingest_im(&weak, false);
        assert_eq!(updated, 0);
        assert_eq!(store.im(&(tx, rx)).unwrap().scan_power, 20);

        let updated = store.ingest_im(&weak, true);
        assert_eq!(updated, 1);
        assert_eq!(store.im(&(tx, rx)).unwrap().scan_power, 5);
    }

    #[test]
    fn pbf_ingestion_requires_both_complete_with_azimuth() {
        let tx = mac("AA");
        let rx = mac("BB");
        let mut scan = base_scan(tx, rx);

        let mut tx_resp = ScanResp::minimal(1, ScanFwStatus::Complete, 0);
        tx_resp.tx_pwr_index = Some(12);
        tx_resp.azimuth_beam = Some(3);
        scan.responses.insert(tx, tx_resp);
        // rx missing azimuth_beam -> should not ingest yet
        scan.responses.insert(rx, ScanResp::minimal(1, ScanFwStatus::Complete, 0));

        let mut store = RfStateStore::new();
        assert!(!store.ingest_pbf(&scan));
        assert!(store.link(&(tx, rx)).is_none());

        scan.responses.get_mut(&rx).unwrap().azimuth_beam = Some(7);
        assert!(store.ingest_pbf(&scan));
        let state = store.link(&(tx, rx)).unwrap();
        assert_eq!(state.tx_beam, 3);
        assert_eq!(state.rx_beam, 7);
        assert_eq!(state.tx_power, 12);
    }

    #[test]
    fn link_state_synthesized_from_im_when_missing() {
        let tx = mac("AA");
        let rx = mac("BB");
        let topo = FakeTopo {
            nodes: vec![
                Node { name: "a".into(), node_type: NodeType::Dn, site_name: "sa".into(), wlan_mac_addrs: vec![tx] },
                Node { name: "b".into(), node_type: NodeType::Dn, site_name: "sb".into(), wlan_mac_addrs: vec![rx] },
            ],
            links: vec![Link {
                name: "l".into(),
                link_type: LinkType::Wireless,
                a_node_mac: tx,
                z_node_mac: rx,
            }],
        };

        let mut store = RfStateStore::new();
        let mut data = RfImData::new(1, 10);
        data.best_tx_beam = Some(4);
        data.best_rx_beam = Some(5);
        // insert directly since we're testing the promotion step in isolation
        store.load_snapshot(RfStateSnapshot {
            link: vec![],
            im: vec![((tx, rx), data)],
            rel_im: vec![],
        });

        let synthesized = store.set_link_state_from_im_data(&topo, 21);
        assert_eq!(synthesized, 1);
        let state = store.link(&(tx, rx)).unwrap();
        assert_eq!(state.tx_beam, 4);
        assert_eq!(state.rx_beam, 5);
        assert_eq!(state.tx_power, 21);
    }
}
