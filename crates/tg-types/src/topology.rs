use crate::mac::RadioMac;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolarityType {
    Odd,
    Even,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Cn,
    Dn,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Flat-earth approximate distance in meters. Good enough at mesh-node
    /// scale (hundreds of meters); not geodesically exact.
    pub fn approx_distance_m(&self, other: &Location) -> f64 {
        const METERS_PER_DEGREE_LAT: f64 = 111_320.0;
        let mean_lat_rad = (self.latitude + other.latitude).to_radians() / 2.0;
        let dx = (self.longitude - other.longitude) * METERS_PER_DEGREE_LAT * mean_lat_rad.cos();
        let dy = (self.latitude - other.latitude) * METERS_PER_DEGREE_LAT;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub node_type: NodeType,
    pub site_name: String,
    pub wlan_mac_addrs: Vec<RadioMac>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Wireless,
    Wired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub link_type: LinkType,
    pub a_node_mac: RadioMac,
    pub z_node_mac: RadioMac,
}

/// A minimal read-only view of the mesh topology. The full topology-wrapper
/// CRUD surface is an external collaborator (spec non-goal); this is just
/// the slice the scan/topology subsystems need to query.
pub trait TopologyView: Send + Sync {
    fn all_nodes(&self) -> Vec<Node>;
    fn all_links(&self) -> Vec<Link>;
    fn node_by_mac(&self, mac: &RadioMac) -> Option<Node>;
    fn site(&self, name: &str) -> Option<Site>;
    fn radio_polarity(&self, mac: &RadioMac) -> Option<PolarityType>;
}

/// Returns whether `a` and `b` can legally form a link direction: neither
/// side may be `Hybrid`-vs-`Hybrid` mismatched, and unset polarities never
/// validate.
pub fn is_valid_link_polarity(a: Option<PolarityType>, b: Option<PolarityType>) -> bool {
    match (a, b) {
        (Some(PolarityType::Odd), Some(PolarityType::Even)) => true,
        (Some(PolarityType::Even), Some(PolarityType::Odd)) => true,
        (Some(PolarityType::Hybrid), Some(_)) | (Some(_), Some(PolarityType::Hybrid)) => true,
        _ => false,
    }
}
