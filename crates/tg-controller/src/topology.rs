//! The controller's topology view (`spec.md` §9: "mutable globals ...
//! replace process-wide singletons with a single `SharedState` value";
//! "every write swaps whole snapshots to preserve consistency"). Loading,
//! editing, and persisting the topology file is topology-wrapper CRUD, an
//! explicit non-goal (`spec.md` §1) — this is only the read slice the scan
//! subsystem needs, backed by a JSON document shaped like the minimal
//! fields `tg_types::TopologyView` requires.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tg_types::{Link, Node, PolarityType, RadioMac, Site, TopologyView};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub sites: Vec<Site>,
    /// Per-radio polarity, flattened as `(mac, polarity)` pairs matching
    /// every other crate's non-string-keyed-map convention over JSON.
    pub polarities: Vec<(RadioMac, PolarityType)>,
}

/// A reader-writer guarded topology snapshot. Reads never block behind a
/// write in progress for longer than the swap itself; every
/// `TopologyStore::set` replaces the whole snapshot atomically, matching
/// the "epoch-style copy-on-write" note in `spec.md` §9.
#[derive(Clone)]
pub struct TopologyStore {
    inner: Arc<RwLock<Arc<TopologySnapshot>>>,
}

impl TopologyStore {
    pub fn new(snapshot: TopologySnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn set(&self, snapshot: TopologySnapshot) {
        let mut guard = self.inner.write().unwrap();
        *guard = Arc::new(snapshot);
    }

    pub fn snapshot(&self) -> Arc<TopologySnapshot> {
        self.inner.read().unwrap().clone()
    }
}

impl TopologyView for TopologyStore {
    fn all_nodes(&self) -> Vec<Node> {
        self.snapshot().nodes.clone()
    }

    fn all_links(&self) -> Vec<Link> {
        self.snapshot().links.clone()
    }

    fn node_by_mac(&self, mac: &RadioMac) -> Option<Node> {
        self.snapshot().nodes.iter().find(|n| n.wlan_mac_addrs.contains(mac)).cloned()
    }

    fn site(&self, name: &str) -> Option<Site> {
        self.snapshot().sites.iter().find(|s| s.name == name).cloned()
    }

    fn radio_polarity(&self, mac: &RadioMac) -> Option<PolarityType> {
        self.snapshot()
            .polarities
            .iter()
            .find(|(m, _)| m == mac)
            .map(|(_, p)| *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_types::{Location, NodeType};

    #[test]
    fn set_swaps_the_whole_snapshot() {
        let store = TopologyStore::new(TopologySnapshot::default());
        assert!(store.all_nodes().is_empty());

        let mac = RadioMac::test_mac("AA");
        store.set(TopologySnapshot {
            nodes: vec![Node {
                name: "a".into(),
                node_type: NodeType::Dn,
                site_name: "site-a".into(),
                wlan_mac_addrs: vec![mac],
            }],
            links: vec![],
            sites: vec![Site {
                name: "site-a".into(),
                location: Location { latitude: 0.0, longitude: 0.0 },
            }],
            polarities: vec![(mac, PolarityType::Odd)],
        });

        assert_eq!(store.all_nodes().len(), 1);
        assert!(store.node_by_mac(&mac).is_some());
        assert_eq!(store.radio_polarity(&mac), Some(PolarityType::Odd));
        assert!(store.site("site-a").is_some());
    }
}
