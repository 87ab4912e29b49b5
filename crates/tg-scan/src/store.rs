use std::collections::HashMap;

use tg_types::{RadioMac, RespId, Scan, ScanFwStatus, ScanId, ScanResp, ScanToken};

use crate::error::ScanError;

/// How a scan's post-processing was triggered. The final handler must run
/// exactly once per scan (invariant 6): either the last expected response
/// arrived, or the per-scan deadline fired first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    AllResponses,
    Timeout,
}

/// Optional filter for `get_scan_status` (`spec.md` §4.F.1).
#[derive(Debug, Clone, Default)]
pub struct ScanStatusFilter {
    pub token_range: Option<(ScanToken, ScanToken)>,
    pub resp_id_range: Option<(RespId, RespId)>,
    /// When set, strips `route_info_list` from returned responses.
    pub concise: bool,
}

/// Owns every in-flight and recently-completed [`Scan`], keyed by both
/// `scan_id` and the `token` radios reply with. Implements the retention
/// policy from `spec.md` §4.F.4: scans beyond `scan_max_results` are
/// evicted by lowest `resp_id`, with timed-out-without-completion scans
/// evicted first.
#[derive(Debug, Default)]
pub struct ScanStore {
    scans: HashMap<ScanId, Scan>,
    token_to_scan: HashMap<ScanToken, ScanId>,
    next_scan_id: ScanId,
    next_token: ScanToken,
    next_resp_id: RespId,
}

impl ScanStore {
    pub fn new() -> Self {
        Self {
            next_scan_id: 1,
            next_token: 1,
            next_resp_id: 1,
            ..Default::default()
        }
    }

    /// Allocates a fresh scan id and token and inserts `scan` (with its
    /// `n_responses_waiting` already set by the caller to the number of
    /// radios it expects a response from). Returns `(scan_id, token)`.
    pub fn insert(&mut self, mut scan: Scan) -> (ScanId, ScanToken) {
        let scan_id = self.next_scan_id;
        self.next_scan_id += 1;
        let token = self.next_token;
        self.next_token += 1;

        scan.scan_id = scan_id;
        self.scans.insert(scan_id, scan);
        self.token_to_scan.insert(token, scan_id);
        (scan_id, token)
    }

    pub fn scan(&self, scan_id: ScanId) -> Option<&Scan> {
        self.scans.get(&scan_id)
    }

    pub fn scan_mut(&mut self, scan_id: ScanId) -> Option<&mut Scan> {
        self.scans.get_mut(&scan_id)
    }

    pub fn scan_id_for_token(&self, token: ScanToken) -> Option<ScanId> {
        self.token_to_scan.get(&token).copied()
    }

    /// Records a single radio's response against `token`. Rejects unknown
    /// tokens and duplicate responses from the same radio. Returns whether
    /// the scan just became complete (all responses arrived) so the
    /// caller can trigger finalization; finalization itself is driven by
    /// [`ScanStore::finalize`], kept separate so it can also be called from
    /// a deadline timer.
    pub fn record_response(
        &mut self,
        token: ScanToken,
        mac: RadioMac,
        resp: ScanResp,
    ) -> Result<bool, ScanError> {
        let scan_id = self.token_to_scan.get(&token).copied().ok_or(ScanError::UnknownToken)?;
        let scan = self.scans.get_mut(&scan_id).ok_or(ScanError::UnknownToken)?;
        if scan.responses.contains_key(&mac) {
            return Err(ScanError::DuplicateResponse);
        }
        scan.responses.insert(mac, resp);
        scan.n_responses_waiting = scan.n_responses_waiting.saturating_sub(1);
        Ok(scan.n_responses_waiting == 0)
    }

    /// Assigns the next monotonically increasing `resp_id` to `scan_id`
    /// (idempotent: a second call on an already-finalized scan is a
    /// no-op) and runs retention eviction. `completion` records whether
    /// this fired via the last response or the timeout deadline.
    pub fn finalize(&mut self, scan_id: ScanId, completion: Completion, max_results: usize) {
        let resp_id = {
            let Some(scan) = self.scans.get_mut(&scan_id) else {
                return;
            };
            if scan.resp_id.is_some() {
                return;
            }
            if completion == Completion::Timeout {
                scan.timed_out = true;
            }
            let resp_id = self.next_resp_id;
            self.next_resp_id += 1;
            scan.resp_id = Some(resp_id);
            resp_id
        };
        tracing::debug!(scan_id, resp_id, ?completion, "scan finalized");
        self.evict_over_capacity(max_results);
    }

    fn evict_over_capacity(&mut self, max_results: usize) {
        while self.scans.len() > max_results {
            let victim = self
                .scans
                .values()
                .filter(|s| s.resp_id.is_some())
                .min_by_key(|s| (!s.timed_out, s.resp_id.unwrap()))
                .map(|s| s.scan_id);
            let Some(victim) = victim else { break };
            self.scans.remove(&victim);
            self.token_to_scan.retain(|_, id| *id != victim);
        }
    }

    /// Drops every record and advances the resp-id low-water mark so future
    /// `resp_id`s never collide with ones issued before the reset.
    pub fn reset(&mut self) {
        self.scans.clear();
        self.token_to_scan.clear();
    }

    pub fn get_status(&self, filter: &ScanStatusFilter) -> Vec<Scan> {
        let mut out: Vec<Scan> = self
            .scans
            .values()
            .filter(|s| {
                if let Some((lo, hi)) = filter.token_range {
                    let in_range = self
                        .token_to_scan
                        .iter()
                        .any(|(tok, id)| *id == s.scan_id && *tok >= lo && *tok <= hi);
                    if !in_range {
                        return false;
                    }
                }
                if let Some((lo, hi)) = filter.resp_id_range {
                    match s.resp_id {
                        Some(id) if id >= lo && id <= hi => {}
                        _ => return false,
                    }
                }
                true
            })
            .cloned()
            .collect();

        if filter.concise {
            for scan in &mut out {
                for resp in scan.responses.values_mut() {
                    resp.route_info_list.clear();
                }
            }
        }
        out.sort_by_key(|s| s.scan_id);
        out
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.scans.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_types::{ScanMode, ScanType};

    fn blank_scan(n_waiting: u32) -> Scan {
        Scan {
            scan_id: 0,
            group_id: None,
            scan_type: ScanType::Pbf,
            scan_mode: ScanMode::Fine,
            sub_type: None,
            tx_node: None,
            rx_nodes: vec![],
            start_bwgd: 0,
            apply_bwgd: None,
            apply: None,
            bwgd_len: None,
            beams: None,
            responses: HashMap::new(),
            n_responses_waiting: n_waiting,
            resp_id: None,
            timed_out: false,
        }
    }

    fn mac(l: &str) -> RadioMac {
        RadioMac::test_mac(l)
    }

    #[test]
    fn duplicate_and_unknown_rejected() {
        let mut store = ScanStore::new();
        let (_, token) = store.insert(blank_scan(1));
        assert!(store.record_response(999, mac("AA"), ScanResp::minimal(999, ScanFwStatus::Complete, 0)).is_err());

        let done = store
            .record_response(token, mac("AA"), ScanResp::minimal(token, ScanFwStatus::Complete, 0))
            .unwrap();
        assert!(done);
        assert!(store
            .record_response(token, mac("AA"), ScanResp::minimal(token, ScanFwStatus::Complete, 0))
            .is_err());
    }

    #[test]
    fn finalize_is_idempotent_and_evicts_by_resp_id() {
        let mut store = ScanStore::new();
        let mut ids = vec![];
        for _ in 0..3 {
            let (id, _) = store.insert(blank_scan(0));
            store.finalize(id, Completion::AllResponses, 2);
            ids.push(id);
        }
        // max_results = 2: the lowest resp_id (first inserted) gets evicted.
        assert_eq!(store.len(), 2);
        assert!(store.scan(ids[0]).is_none());
        assert!(store.scan(ids[2]).is_some());

        // Re-finalizing doesn't reassign resp_id.
        let before = store.scan(ids[2]).unwrap().resp_id;
        store.finalize(ids[2], Completion::Timeout, 2);
        assert_eq!(store.scan(ids[2]).unwrap().resp_id, before);
        assert!(!store.scan(ids[2]).unwrap().timed_out);
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = ScanStore::new();
        let (id, _) = store.insert(blank_scan(0));
        store.finalize(id, Completion::AllResponses, 100);
        store.reset();
        assert_eq!(store.len(), 0);
        assert_eq!(store.get_status(&ScanStatusFilter::default()).len(), 0);
    }
}
