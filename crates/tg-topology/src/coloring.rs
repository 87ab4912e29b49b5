use std::collections::{BTreeSet, HashMap};

use rand::Rng;
use tg_types::{Link, Node, RadioMac, TopologyView};

use crate::graph::{has_common_nodes, Graph};

/// Maximum distance (meters) for two radios' sites to be considered
/// hearable for scan-scheduling purposes.
pub const DEFAULT_SCAN_MAX_DISTANCE_M: f64 = 350.0;

/// Partitions radios into scheduling groups ("colors"): radios in the same
/// group may run scans concurrently; radios in different groups must not.
pub struct ColorScheduler {
    macs: Vec<RadioMac>,
    adjacency: Graph,
    hearability: Graph,
}

impl ColorScheduler {
    pub fn build(topo: &dyn TopologyView, scan_max_distance_m: f64) -> Self {
        let macs = all_macs(topo);
        let adjacency = adjacency_matrix(topo, &macs);
        let hearability = hearability_matrix(topo, &macs, scan_max_distance_m);
        Self {
            macs,
            adjacency,
            hearability,
        }
    }

    pub fn all_macs(&self) -> &[RadioMac] {
        &self.macs
    }

    pub fn adjacency_neighbors(&self, mac: &RadioMac) -> Vec<RadioMac> {
        self.index_of(mac)
            .map(|i| self.adjacency.neighbors(i).into_iter().map(|j| self.macs[j]).collect())
            .unwrap_or_default()
    }

    pub fn hearability_neighbors(&self, mac: &RadioMac) -> Vec<RadioMac> {
        self.index_of(mac)
            .map(|i| self.hearability.neighbors(i).into_iter().map(|j| self.macs[j]).collect())
            .unwrap_or_default()
    }

    fn index_of(&self, mac: &RadioMac) -> Option<usize> {
        self.macs.iter().position(|m| m == mac)
    }

    /// Computes the scheduling groups: each inner vector is a set of radios
    /// colored identically, i.e. eligible to scan at the same time.
    pub fn sched_groups(&self, rng: &mut impl Rng) -> Vec<Vec<RadioMac>> {
        let exclusion = exclusion_matrix(&self.hearability, &self.adjacency);
        let groups: Vec<Vec<RadioMac>> = graph_coloring(&exclusion, rng)
            .into_iter()
            .map(|group| group.into_iter().map(|i| self.macs[i]).collect())
            .collect();
        tracing::debug!(num_radios = self.macs.len(), num_groups = groups.len(), "computed scan scheduling groups");
        groups
    }
}

fn all_macs(topo: &dyn TopologyView) -> Vec<RadioMac> {
    let mut macs = Vec::new();
    for node in topo.all_nodes() as Vec<Node> {
        macs.extend(node.wlan_mac_addrs);
    }
    macs
}

fn adjacency_matrix(topo: &dyn TopologyView, macs: &[RadioMac]) -> Graph {
    let mac2index: HashMap<RadioMac, usize> =
        macs.iter().enumerate().map(|(i, m)| (*m, i)).collect();
    let mut g = Graph::new(macs.len());
    for link in topo.all_links() as Vec<Link> {
        if let (Some(&i), Some(&j)) = (
            mac2index.get(&link.a_node_mac),
            mac2index.get(&link.z_node_mac),
        ) {
            g.add_edge(i, j);
        }
    }
    g
}

fn hearability_matrix(topo: &dyn TopologyView, macs: &[RadioMac], max_distance_m: f64) -> Graph {
    let locations: Vec<Option<tg_types::Location>> = macs
        .iter()
        .map(|mac| {
            let node = topo.node_by_mac(mac)?;
            let site = topo.site(&node.site_name)?;
            Some(site.location)
        })
        .collect();

    let mut g = Graph::new(macs.len());
    for i in 1..macs.len() {
        for j in 0..i {
            if let (Some(li), Some(lj)) = (locations[i], locations[j]) {
                if li.approx_distance_m(&lj) < max_distance_m {
                    g.add_edge(i, j);
                }
            }
        }
    }
    g
}

/// Two radios exclude each other from sharing a color iff:
/// - they (or a shared neighbor) are mutually hearable, or
/// - one is hearable to a neighbor the other is directly linked to, or
/// - they are themselves directly linked.
///
/// The last clause isn't present in the upstream hearability-only formula;
/// it's added so that a link's own two endpoints never land in the same
/// scheduling color purely by virtue of having no hearability neighbors in
/// common (see `DESIGN.md`).
fn exclusion_matrix(hearability: &Graph, adjacency: &Graph) -> Graph {
    let n = hearability.size();
    let mut exclusion = Graph::new(n);
    for i in 1..n {
        for j in 0..i {
            let excluded = has_common_nodes(
                &hearability.neighbors_with_self(i),
                &hearability.neighbors_with_self(j),
            ) || has_common_nodes(&hearability.neighbors(i), &adjacency.neighbors(j))
                || has_common_nodes(&adjacency.neighbors(i), &hearability.neighbors(j))
                || adjacency.has_edge(i, j);
            if excluded {
                exclusion.add_edge(i, j);
            }
        }
    }
    exclusion
}

fn colors_complement(colors: &BTreeSet<i32>, max_color: i32) -> Vec<i32> {
    (1..=max_color).filter(|c| !colors.contains(c)).collect()
}

/// Greedy largest-saturation-first (DSATUR-like) vertex coloring: repeatedly
/// picks the uncolored vertex whose neighborhood uses the most distinct
/// colors (ties broken by degree), assigns it a color unused among its
/// neighbors (randomly, when more than one choice exists), and introduces a
/// new color only when every existing one is already used nearby.
fn graph_coloring(g: &Graph, rng: &mut impl Rng) -> Vec<Vec<usize>> {
    let n = g.size();
    let mut color_id = vec![0i32; n];
    let mut unassigned: BTreeSet<usize> = (0..n).collect();
    let mut cur_max_color = 1i32;

    while !unassigned.is_empty() {
        let mut best_key: Option<(usize, usize)> = None;
        let mut best_vertex = 0usize;
        let mut best_color = 0i32;

        for &vertex in &unassigned {
            let neighbors = g.neighbors(vertex);
            let colors_in_neighborhood: BTreeSet<i32> = neighbors
                .iter()
                .filter_map(|&n| (color_id[n] != 0).then_some(color_id[n]))
                .collect();

            let available = colors_complement(&colors_in_neighborhood, cur_max_color);
            let potential_color = if available.is_empty() {
                cur_max_color + 1
            } else {
                available[rng.gen_range(0..available.len())]
            };

            let key = (colors_in_neighborhood.len(), neighbors.len());
            if best_key.is_none() || best_key.unwrap() < key {
                best_key = Some(key);
                best_vertex = vertex;
                best_color = potential_color;
            }
        }

        if best_color == cur_max_color + 1 {
            cur_max_color += 1;
        }
        color_id[best_vertex] = best_color;
        unassigned.remove(&best_vertex);
    }

    let mut coloring = vec![Vec::new(); cur_max_color as usize];
    for (i, &c) in color_id.iter().enumerate() {
        coloring[(c - 1) as usize].push(i);
    }
    coloring
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap as Map;
    use tg_types::{Location, NodeType, PolarityType, Site};

    struct FakeTopo {
        nodes: Vec<Node>,
        links: Vec<Link>,
        sites: Map<String, Site>,
    }

    impl TopologyView for FakeTopo {
        fn all_nodes(&self) -> Vec<Node> {
            self.nodes.clone()
        }
        fn all_links(&self) -> Vec<Link> {
            self.links.clone()
        }
        fn node_by_mac(&self, mac: &RadioMac) -> Option<Node> {
            self.nodes
                .iter()
                .find(|n| n.wlan_mac_addrs.contains(mac))
                .cloned()
        }
        fn site(&self, name: &str) -> Option<Site> {
            self.sites.get(name).cloned()
        }
        fn radio_polarity(&self, _mac: &RadioMac) -> Option<PolarityType> {
            None
        }
    }

    fn node(label: &str, site: &str) -> Node {
        Node {
            name: label.to_string(),
            node_type: NodeType::Dn,
            site_name: site.to_string(),
            wlan_mac_addrs: vec![RadioMac::test_mac(label)],
        }
    }

    fn link(a: &str, z: &str) -> Link {
        Link {
            name: format!("link-{a}-{z}"),
            link_type: tg_types::LinkType::Wireless,
            a_node_mac: RadioMac::test_mac(a),
            z_node_mac: RadioMac::test_mac(z),
        }
    }

    #[test]
    fn s4_coloring_independence() {
        // A-B-C-D line, distinct far-apart sites so there are no
        // hearability edges beyond the links themselves.
        let sites: Map<String, Site> = [
            ("sa", (0.0, 0.0)),
            ("sb", (1.0, 0.0)),
            ("sc", (2.0, 0.0)),
            ("sd", (3.0, 0.0)),
        ]
        .into_iter()
        .map(|(n, (lat, lon))| {
            (
                n.to_string(),
                Site {
                    name: n.to_string(),
                    location: Location {
                        latitude: lat,
                        longitude: lon,
                    },
                },
            )
        })
        .collect();

        let topo = FakeTopo {
            nodes: vec![
                node("AA", "sa"),
                node("BB", "sb"),
                node("CC", "sc"),
                node("DD", "sd"),
            ],
            links: vec![link("AA", "BB"), link("BB", "CC"), link("CC", "DD")],
            sites,
        };

        let scheduler = ColorScheduler::build(&topo, DEFAULT_SCAN_MAX_DISTANCE_M);
        let mut rng = StdRng::seed_from_u64(42);
        let groups = scheduler.sched_groups(&mut rng);

        assert_eq!(groups.len(), 2);
        let color_of = |mac: RadioMac| groups.iter().position(|g| g.contains(&mac)).unwrap();
        let a = RadioMac::test_mac("AA");
        let b = RadioMac::test_mac("BB");
        let c = RadioMac::test_mac("CC");
        let d = RadioMac::test_mac("DD");
        assert_eq!(color_of(a), color_of(c));
        assert_eq!(color_of(b), color_of(d));
        assert_ne!(color_of(a), color_of(b));
    }
}
