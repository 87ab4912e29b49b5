/// A simple undirected graph on nodes `0..n`, backed by an adjacency matrix.
/// Meant for the scan-scheduling graphs (adjacency, hearability, exclusion),
/// which stay small (node counts in the tens to low hundreds).
#[derive(Debug, Clone)]
pub struct Graph {
    matrix: Vec<Vec<bool>>,
}

impl Graph {
    pub fn new(n: usize) -> Self {
        Self {
            matrix: vec![vec![false; n]; n],
        }
    }

    pub fn add_edge(&mut self, i: usize, j: usize) {
        self.matrix[i][j] = true;
        self.matrix[j][i] = true;
    }

    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        self.matrix[i][j]
    }

    pub fn size(&self) -> usize {
        self.matrix.len()
    }

    pub fn neighbors(&self, node: usize) -> Vec<usize> {
        self.matrix[node]
            .iter()
            .enumerate()
            .filter_map(|(i, &present)| present.then_some(i))
            .collect()
    }

    pub fn neighbors_with_self(&self, node: usize) -> Vec<usize> {
        let mut res = self.neighbors(node);
        res.push(node);
        res
    }
}

fn has_common(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|x| b.contains(x))
}

pub(crate) fn has_common_nodes(a: &[usize], b: &[usize]) -> bool {
    has_common(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_are_symmetric() {
        let mut g = Graph::new(4);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        assert_eq!(g.neighbors(0), vec![1]);
        assert_eq!(g.neighbors(1), vec![0, 2]);
        assert_eq!(g.neighbors(3), Vec::<usize>::new());
    }

    #[test]
    fn neighbors_with_self_includes_self() {
        let mut g = Graph::new(3);
        g.add_edge(0, 1);
        assert_eq!(g.neighbors_with_self(0), vec![1, 0]);
    }
}
