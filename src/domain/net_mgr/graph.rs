use std::collections::{HashMap, VecDeque};

use crate::domain::ids::{LinkId, SwitchId};
use crate::domain::net_mgr::obligation::Obligation;
use crate::domain::pledge::PledgeWindow;

#[derive(Debug, Clone)]
pub struct Switch {
    pub id: SwitchId,

    /// Compute node hosting this OVS bridge, when known.
    pub phost: Option<String>,
}

/// A directed switch-to-switch link with its time-indexed allotment. The
/// physical wire appears as two directed links, one per traffic direction.
#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub src: SwitchId,
    pub src_port: i32,
    pub dst: SwitchId,
    pub dst_port: i32,
    pub capacity: i64,
    pub obligation: Obligation,
}

/// The live multigraph of switches and directed links.
#[derive(Debug, Default)]
pub struct NetGraph {
    switches: HashMap<SwitchId, Switch>,
    links: HashMap<LinkId, Link>,

    /// Outgoing links per switch, sorted by (destination, link id) so path
    /// search is deterministic.
    adjacency: HashMap<SwitchId, Vec<LinkId>>,

    /// (src, dst) -> directed links between the pair, sorted.
    by_pair: HashMap<(SwitchId, SwitchId), Vec<LinkId>>,
}

impl NetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_switch(&mut self, id: SwitchId, phost: Option<String>) {
        self.switches.insert(id.clone(), Switch { id, phost });
    }

    pub fn add_link(&mut self, id: LinkId, src: SwitchId, src_port: i32, dst: SwitchId, dst_port: i32, capacity: i64) {
        if !self.switches.contains_key(&src) {
            self.add_switch(src.clone(), None);
        }
        if !self.switches.contains_key(&dst) {
            self.add_switch(dst.clone(), None);
        }

        let link =
            Link { id: id.clone(), src: src.clone(), src_port, dst: dst.clone(), dst_port, capacity, obligation: Obligation::new(capacity) };

        // Replacing a link with a duplicate id keeps the newest definition.
        if self.links.insert(id.clone(), link).is_some() {
            log::warn!("duplicate link id {} replaces the earlier definition", id);
            self.reindex();
            return;
        }

        let adj = self.adjacency.entry(src.clone()).or_default();
        adj.push(id.clone());
        adj.sort_by(|a, b| {
            let da = &self.links[a].dst;
            let db = &self.links[b].dst;
            (da, a).cmp(&(db, b))
        });

        let pair = self.by_pair.entry((src, dst)).or_default();
        pair.push(id);
        pair.sort();
    }

    fn reindex(&mut self) {
        self.adjacency.clear();
        self.by_pair.clear();

        let mut ids: Vec<LinkId> = self.links.keys().cloned().collect();
        ids.sort();

        for id in ids {
            let (src, dst) = {
                let link = &self.links[&id];
                (link.src.clone(), link.dst.clone())
            };

            self.adjacency.entry(src.clone()).or_default().push(id.clone());
            self.by_pair.entry((src, dst)).or_default().push(id);
        }

        let links = &self.links;
        for adj in self.adjacency.values_mut() {
            adj.sort_by(|a, b| (&links[a].dst, a).cmp(&(&links[b].dst, b)));
        }
        for pair in self.by_pair.values_mut() {
            pair.sort();
        }
    }

    pub fn switch(&self, id: &SwitchId) -> Option<&Switch> {
        self.switches.get(id)
    }

    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.switches.values()
    }

    pub fn link(&self, id: &LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn link_mut(&mut self, id: &LinkId) -> Option<&mut Link> {
        self.links.get_mut(id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// The directed link carrying traffic the opposite way: same pair of
    /// switches, reversed. Parallel twins resolve to the lexicographically
    /// first candidate.
    pub fn twin_of(&self, id: &LinkId) -> Option<&LinkId> {
        let link = self.links.get(id)?;
        self.by_pair.get(&(link.dst.clone(), link.src.clone())).and_then(|v| v.first())
    }

    /// Breadth-first search for the shortest admitting route from `from` to
    /// `to`. A link admits when its own allotment can carry `amt_out` and
    /// its twin can carry `amt_in` over the window. Returns the forward
    /// link sequence, empty when `from == to`.
    pub fn find_route(&self, from: &SwitchId, to: &SwitchId, window: &PledgeWindow, amt_out: i64, amt_in: i64, cap_pct: u8) -> Option<Vec<LinkId>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut prev: HashMap<SwitchId, LinkId> = HashMap::new();
        let mut queue: VecDeque<SwitchId> = VecDeque::new();
        queue.push_back(from.clone());

        while let Some(sw) = queue.pop_front() {
            let Some(adj) = self.adjacency.get(&sw) else { continue };

            for link_id in adj {
                let link = &self.links[link_id];

                if link.dst == *from || prev.contains_key(&link.dst) {
                    continue;
                }
                if !self.link_admits(link_id, window, amt_out, amt_in, cap_pct) {
                    continue;
                }

                prev.insert(link.dst.clone(), link_id.clone());

                if link.dst == *to {
                    return Some(self.unwind(from, to, &prev));
                }

                queue.push_back(link.dst.clone());
            }
        }

        None
    }

    fn link_admits(&self, id: &LinkId, window: &PledgeWindow, amt_out: i64, amt_in: i64, cap_pct: u8) -> bool {
        let link = &self.links[id];

        if !link.obligation.can_increase(window.commence, window.expiry, amt_out, cap_pct) {
            return false;
        }

        match self.twin_of(id) {
            Some(twin_id) => {
                let twin = &self.links[twin_id];
                twin.obligation.can_increase(window.commence, window.expiry, amt_in, cap_pct)
            }
            // A one-way link cannot carry the acknowledgement traffic.
            None => false,
        }
    }

    fn unwind(&self, from: &SwitchId, to: &SwitchId, prev: &HashMap<SwitchId, LinkId>) -> Vec<LinkId> {
        let mut route: Vec<LinkId> = Vec::new();
        let mut cursor = to.clone();

        while cursor != *from {
            let link_id = prev[&cursor].clone();
            cursor = self.links[&link_id].src.clone();
            route.push(link_id);
        }

        route.reverse();
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> PledgeWindow {
        PledgeWindow { commence: 100, expiry: 200 }
    }

    fn triangle() -> NetGraph {
        // s1 -> s2 -> s3 plus the direct s1 -> s3 pair, both directions.
        let mut g = NetGraph::new();
        for (a, b) in [("s1", "s2"), ("s2", "s3"), ("s1", "s3")] {
            g.add_link(LinkId::new(format!("{}-{}", a, b)), SwitchId::new(a), 1, SwitchId::new(b), 2, 1000);
            g.add_link(LinkId::new(format!("{}-{}", b, a)), SwitchId::new(b), 2, SwitchId::new(a), 1, 1000);
        }
        g
    }

    #[test]
    fn shortest_route_wins() {
        let g = triangle();
        let route = g.find_route(&SwitchId::new("s1"), &SwitchId::new("s3"), &window(), 100, 100, 100).expect("route must exist");

        assert_eq!(route, vec![LinkId::new("s1-s3")], "the one-hop route must beat the two-hop route");
    }

    #[test]
    fn saturated_link_is_routed_around() {
        let mut g = triangle();
        g.link_mut(&LinkId::new("s1-s3")).unwrap().obligation.increase(100, 200, 950);

        let route = g.find_route(&SwitchId::new("s1"), &SwitchId::new("s3"), &window(), 100, 100, 100).expect("detour must exist");

        assert_eq!(route, vec![LinkId::new("s1-s2"), LinkId::new("s2-s3")]);
    }

    #[test]
    fn no_admitting_route_returns_none() {
        let mut g = triangle();
        for id in ["s1-s3", "s1-s2"] {
            g.link_mut(&LinkId::new(id)).unwrap().obligation.increase(100, 200, 950);
        }

        assert!(g.find_route(&SwitchId::new("s1"), &SwitchId::new("s3"), &window(), 100, 100, 100).is_none());
    }

    #[test]
    fn reverse_capacity_gates_admission() {
        let mut g = triangle();
        // Forward direction is clear but the return path is saturated.
        g.link_mut(&LinkId::new("s3-s1")).unwrap().obligation.increase(100, 200, 950);
        g.link_mut(&LinkId::new("s3-s2")).unwrap().obligation.increase(100, 200, 950);

        assert!(
            g.find_route(&SwitchId::new("s1"), &SwitchId::new("s3"), &window(), 100, 100, 100).is_none(),
            "a route whose twin links cannot carry the inbound amount must not admit"
        );
    }

    #[test]
    fn co_resident_endpoints_need_no_links() {
        let g = triangle();
        let route = g.find_route(&SwitchId::new("s1"), &SwitchId::new("s1"), &window(), 100, 100, 100);

        assert_eq!(route, Some(Vec::new()));
    }
}
