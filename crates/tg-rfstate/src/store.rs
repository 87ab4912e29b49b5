use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tg_types::{LinkType, RadioMac, Scan, TopologyView};

use crate::types::{BeamKey, LinkKey, RfImData, RfLinkState, RfRelImData, SCAN_SNR_MIN};

/// The RF state store: steady-state link beams/power (from PBF), IM scan
/// aggregates, and relative-IM cross-link offsets (used by LA/TPC).
///
/// Mutations set `dirty`; consumers that regenerate downstream config (CBF,
/// LA/TPC) clear it once they've picked up the change.
#[derive(Debug, Default)]
pub struct RfStateStore {
    link: HashMap<LinkKey, RfLinkState>,
    im: HashMap<LinkKey, RfImData>,
    rel_im: HashMap<LinkKey, RfRelImData>,
    dirty: bool,
}

/// Wire-friendly snapshot of [`RfStateStore`]. `HashMap` with tuple keys
/// doesn't round-trip through `serde_json` (object keys must be strings),
/// so the wire form flattens each table to a list of pairs instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RfStateSnapshot {
    pub link: Vec<(LinkKey, RfLinkState)>,
    pub im: Vec<(LinkKey, RfImData)>,
    pub rel_im: Vec<(LinkKey, RfRelImData)>,
}

impl RfStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn reset(&mut self) {
        self.link.clear();
        self.im.clear();
        self.rel_im.clear();
        self.dirty = false;
    }

    pub fn link(&self, key: &LinkKey) -> Option<&RfLinkState> {
        self.link.get(key)
    }

    pub fn im(&self, key: &LinkKey) -> Option<&RfImData> {
        self.im.get(key)
    }

    pub fn rel_im(&self, key: &LinkKey) -> Option<&RfRelImData> {
        self.rel_im.get(key)
    }

    pub fn to_snapshot(&self) -> RfStateSnapshot {
        RfStateSnapshot {
            link: self.link.iter().map(|(k, v)| (*k, v.clone())).collect(),
            im: self.im.iter().map(|(k, v)| (*k, v.clone())).collect(),
            rel_im: self.rel_im.iter().map(|(k, v)| (*k, v.clone())).collect(),
        }
    }

    pub fn load_snapshot(&mut self, snapshot: RfStateSnapshot) {
        self.link = snapshot.link.into_iter().collect();
        self.im = snapshot.im.into_iter().collect();
        self.rel_im = snapshot.rel_im.into_iter().collect();
        self.dirty = true;
    }

    /// Ingests a completed PBF scan: requires a COMPLETE response with
    /// `azimuth_beam` present from both tx and rx, and `tx_pwr_index` from
    /// tx. Writes `{txBeam, rxBeam, txPower}` under `(tx, rx)`.
    pub fn ingest_pbf(&mut self, scan: &Scan) -> bool {
        let Some(tx_node) = scan.tx_node else {
            return false;
        };
        let (mut tx_beam, mut tx_power, mut rx_beam, mut rx_node) = (None, None, None, None);
        for (&mac, resp) in &scan.responses {
            if !resp.status.is_complete() || resp.azimuth_beam.is_none() {
                tracing::debug!(scan_id = scan.scan_id, ?mac, "pbf ingestion: incomplete response");
                return false;
            }
            if mac == tx_node {
                let Some(power) = resp.tx_pwr_index else {
                    tracing::debug!(scan_id = scan.scan_id, "pbf ingestion: tx power missing");
                    return false;
                };
                tx_power = Some(power);
                tx_beam = resp.azimuth_beam;
            } else {
                rx_beam = resp.azimuth_beam;
                rx_node = Some(mac);
            }
        }
        let (Some(tx_beam), Some(tx_power), Some(rx_beam), Some(rx_node)) =
            (tx_beam, tx_power, rx_beam, rx_node)
        else {
            return false;
        };
        self.link.insert(
            (tx_node, rx_node),
            RfLinkState {
                tx_beam,
                rx_beam,
                tx_power,
            },
        );
        self.dirty = true;
        true
    }

    /// Ingests a completed IM scan. Aggregates `routeInfoList` by
    /// `(txBeam, rxBeam)`, averages SNR per pair, and records `offset =
    /// avg - txPower` plus the best pair. An existing record with higher
    /// `scanPower` and strictly more routes is kept unless `override_old`.
    /// Returns the number of per-rx-node records updated.
    pub fn ingest_im(&mut self, scan: &Scan, override_old: bool) -> usize {
        let Some(tx_node) = scan.tx_node else {
            return 0;
        };
        let Some(tx_resp) = scan.responses.get(&tx_node) else {
            return 0;
        };
        if !tx_resp.status.is_complete() {
            return 0;
        }
        let Some(tx_power) = tx_resp.tx_pwr_index else {
            return 0;
        };

        let mut updated = 0;
        for (&rx_node, resp) in &scan.responses {
            if rx_node == tx_node || !resp.status.is_complete() {
                continue;
            }

            let mut snr_sums: HashMap<BeamKey, (f32, u32)> = HashMap::new();
            for route in &resp.route_info_list {
                let entry = snr_sums.entry((route.tx_beam, route.rx_beam)).or_default();
                entry.0 += route.snr_est;
                entry.1 += 1;
            }

            let mut data = RfImData::new(scan.scan_id, tx_power);
            let mut best_snr = SCAN_SNR_MIN;
            for (&(tx_beam, rx_beam), &(sum, count)) in &snr_sums {
                let avg = sum / count as f32;
                data.routes.insert((tx_beam, rx_beam), avg - tx_power as f32);
                if avg > best_snr {
                    best_snr = avg;
                    data.best_tx_beam = Some(tx_beam);
                    data.best_rx_beam = Some(rx_beam);
                }
            }

            let key = (tx_node, rx_node);
            if !override_old {
                if let Some(existing) = self.im.get(&key) {
                    if existing.scan_power > data.scan_power && existing.routes.len() > data.routes.len()
                    {
                        tracing::debug!(?key, "im ingestion: keeping stronger existing scan");
                        continue;
                    }
                }
            }
            self.im.insert(key, data);
            self.dirty = true;
            updated += 1;
        }
        updated
    }

    /// Ingests a completed relative-IM scan (only meaningful when `scan.apply`
    /// is set): partitions both tx's and each rx's routes by the beam each
    /// peer reports it used, and for every `(txLinkRxNode, rxLinkTxNode)`
    /// pair sharing those beams records the averaged SNR offset under the
    /// key `(txNode, txLinkRxNode)` -> routes `(rxLinkTxNode, rxNode)`.
    pub fn ingest_rel_im(&mut self, scan: &Scan, topo: &dyn TopologyView) -> usize {
        if !scan.apply.unwrap_or(false) {
            return 0;
        }
        let Some(tx_node) = scan.tx_node else {
            return 0;
        };
        let Some(tx_resp) = scan.responses.get(&tx_node) else {
            return 0;
        };
        if !tx_resp.status.is_complete() {
            return 0;
        }
        let Some(tx_power) = tx_resp.tx_pwr_index else {
            return 0;
        };
        let Some(tx_beam_info) = &tx_resp.beam_info_list else {
            return 0;
        };
        let tx_beam_map = beam_map(topo, tx_beam_info);

        let mut pending: HashMap<LinkKey, RfRelImData> = HashMap::new();
        for (&rx_node, resp) in &scan.responses {
            if rx_node == tx_node || !resp.status.is_complete() || resp.route_info_list.is_empty() {
                continue;
            }
            let Some(rx_beam_info) = &resp.beam_info_list else {
                continue;
            };
            let rx_beam_map = beam_map(topo, rx_beam_info);

            let mut snr_sums: HashMap<BeamKey, (f32, u32)> = HashMap::new();
            for route in &resp.route_info_list {
                if !tx_beam_map.contains_key(&route.tx_beam) || !rx_beam_map.contains_key(&route.rx_beam) {
                    continue;
                }
                let entry = snr_sums.entry((route.tx_beam, route.rx_beam)).or_default();
                entry.0 += route.snr_est;
                entry.1 += 1;
            }

            for (&(tx_beam, rx_beam), &(sum, count)) in &snr_sums {
                let avg = sum / count as f32;
                let offset = avg - tx_power as f32;
                for &tx_link_rx_node in &tx_beam_map[&tx_beam] {
                    let tx_key = (tx_node, tx_link_rx_node);
                    for &rx_link_tx_node in &rx_beam_map[&rx_beam] {
                        let rx_key = (rx_link_tx_node, rx_node);
                        pending
                            .entry(tx_key)
                            .or_insert_with(|| RfRelImData::new(scan.scan_id, tx_power))
                            .routes
                            .insert(rx_key, offset);
                    }
                }
            }
        }

        let updated = pending.len();
        for (key, data) in pending {
            self.rel_im.insert(key, data);
        }
        if updated > 0 {
            self.dirty = true;
        }
        updated
    }

    /// For every wireless link missing steady-state link state, promotes
    /// the best IM beams (in either direction) to a synthetic link state at
    /// `cbf_max_tx_pwr`. Returns the number of links synthesized.
    pub fn set_link_state_from_im_data(
        &mut self,
        topo: &dyn TopologyView,
        cbf_max_tx_pwr: i16,
    ) -> usize {
        let mut synthesized = 0;
        for link in topo.all_links() {
            if link.link_type != LinkType::Wireless {
                continue;
            }
            for (tx_node, rx_node) in [
                (link.a_node_mac, link.z_node_mac),
                (link.z_node_mac, link.a_node_mac),
            ] {
                let key = (tx_node, rx_node);
                if self.link.contains_key(&key) {
                    continue;
                }
                let Some(im) = self.im.get(&key) else {
                    continue;
                };
                let (Some(tx_beam), Some(rx_beam)) = (im.best_tx_beam, im.best_rx_beam) else {
                    continue;
                };
                self.link.insert(
                    key,
                    RfLinkState {
                        tx_beam,
                        rx_beam,
                        tx_power: cbf_max_tx_pwr,
                    },
                );
                synthesized += 1;
            }
        }
        tracing::debug!(synthesized, "synthesized link state from im data");
        synthesized
    }
}

fn beam_map(topo: &dyn TopologyView, beam_info: &[tg_types::BeamInfo]) -> HashMap<i16, Vec<RadioMac>> {
    let mut map: HashMap<i16, Vec<RadioMac>> = HashMap::new();
    for info in beam_info {
        if topo.node_by_mac(&info.addr).is_none() {
            continue;
        }
        map.entry(info.beam).or_default().push(info.addr);
    }
    map
}
