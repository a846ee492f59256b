//! Index-based vertex/triangle arena.
//!
//! Connectivity is stored as plain integer indices: every triangle cell
//! carries its three vertex indices in counterclockwise order plus the
//! index of the neighboring cell across each edge, and every vertex carries
//! one incident cell. This gives O(1) stepping between adjacent cells and
//! O(ring) recovery of ordered neighbor rings without any pointer chains.

use std::collections::HashMap;

use crate::errors::{InterpError, InterpResult};
use crate::geometry::domain::Domain;

/// A triangle in the arena.
///
/// `neighbors[k]` is the cell across the edge opposite `vertices[k]`, i.e.
/// the edge from `vertices[(k + 1) % 3]` to `vertices[(k + 2) % 3]`.
/// `None` marks a hull edge (planar meshes only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleCell {
    /// Vertex indices in counterclockwise order
    pub vertices: [usize; 3],
    /// Adjacent cell across the edge opposite each vertex
    pub neighbors: [Option<usize>; 3],
}

impl TriangleCell {
    /// Creates a cell with no neighbor links.
    #[must_use]
    pub const fn new(vertices: [usize; 3]) -> Self {
        Self {
            vertices,
            neighbors: [None, None, None],
        }
    }

    /// Local index of vertex `v` within this cell, if present.
    #[must_use]
    pub fn local_index_of(&self, v: usize) -> Option<usize> {
        self.vertices.iter().position(|&u| u == v)
    }

    /// Directed edge opposite local vertex `k`, oriented so the cell lies
    /// to its left.
    #[must_use]
    pub const fn edge(&self, k: usize) -> (usize, usize) {
        (self.vertices[(k + 1) % 3], self.vertices[(k + 2) % 3])
    }
}

/// A hull edge together with its single incident cell (planar only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HullEdge {
    /// Start vertex, oriented so the mesh interior lies to the left
    pub from: usize,
    /// End vertex
    pub to: usize,
    /// The one cell incident to this edge
    pub cell: usize,
}

/// Immutable triangulated point set with adjacency.
#[derive(Debug, Clone)]
pub struct MeshArena<D: Domain> {
    points: Vec<D::Point>,
    cells: Vec<TriangleCell>,
    vertex_cell: Vec<usize>,
    hull: Vec<HullEdge>,
}

impl<D: Domain> MeshArena<D> {
    /// Assembles an arena from points and raw vertex triples, deriving all
    /// neighbor links, per-vertex incident cells, and the hull edge list.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::DegenerateGeometry`] if an edge is shared by
    /// more than two cells, a vertex belongs to no cell, or a hull edge
    /// appears on a surface that admits none.
    pub fn from_cells(points: Vec<D::Point>, triples: Vec<[usize; 3]>) -> InterpResult<Self> {
        let mut cells: Vec<TriangleCell> = triples.into_iter().map(TriangleCell::new).collect();
        let hull = link_neighbors(&mut cells)?;
        if !D::HAS_BOUNDARY && !hull.is_empty() {
            return Err(InterpError::DegenerateGeometry {
                reason: format!("{} hull edges on a closed surface", hull.len()),
            });
        }

        let mut vertex_cell = vec![usize::MAX; points.len()];
        for (t, cell) in cells.iter().enumerate() {
            for &v in &cell.vertices {
                vertex_cell[v] = t;
            }
        }
        if let Some(v) = vertex_cell.iter().position(|&t| t == usize::MAX) {
            return Err(InterpError::DegenerateGeometry {
                reason: format!("vertex {v} belongs to no cell"),
            });
        }

        Ok(Self {
            points,
            cells,
            vertex_cell,
            hull,
        })
    }

    /// Number of vertices.
    #[must_use]
    pub const fn npoints(&self) -> usize {
        self.points.len()
    }

    /// Number of triangle cells.
    #[must_use]
    pub const fn ncells(&self) -> usize {
        self.cells.len()
    }

    /// All vertex coordinates, indexed by vertex.
    #[must_use]
    pub fn points(&self) -> &[D::Point] {
        &self.points
    }

    /// Coordinate of one vertex.
    #[must_use]
    pub fn point(&self, v: usize) -> D::Point {
        self.points[v]
    }

    /// All triangle cells.
    #[must_use]
    pub fn cells(&self) -> &[TriangleCell] {
        &self.cells
    }

    /// One triangle cell.
    #[must_use]
    pub fn cell(&self, t: usize) -> &TriangleCell {
        &self.cells[t]
    }

    /// Hull edges (empty on closed surfaces).
    #[must_use]
    pub fn hull(&self) -> &[HullEdge] {
        &self.hull
    }

    /// The three corner coordinates of cell `t`.
    #[must_use]
    pub fn corners(&self, t: usize) -> [D::Point; 3] {
        let [a, b, c] = self.cells[t].vertices;
        [self.points[a], self.points[b], self.points[c]]
    }

    /// Steps clockwise around vertex `v` from cell `t` (across the edge
    /// leaving `v` in counterclockwise cell order).
    fn cw_step(&self, t: usize, v: usize) -> Option<usize> {
        let i = self.cells[t].local_index_of(v)?;
        self.cells[t].neighbors[(i + 2) % 3]
    }

    /// Steps counterclockwise around vertex `v` from cell `t`.
    fn ccw_step(&self, t: usize, v: usize) -> Option<usize> {
        let i = self.cells[t].local_index_of(v)?;
        self.cells[t].neighbors[(i + 1) % 3]
    }

    /// The cell at the clockwise end of `v`'s fan, or the starting cell for
    /// interior vertices.
    fn fan_start(&self, v: usize) -> usize {
        let start = self.vertex_cell[v];
        let mut t = start;
        loop {
            match self.cw_step(t, v) {
                Some(next) if next != start => t = next,
                Some(_) => return start, // closed fan, interior vertex
                None => return t,        // hit the hull
            }
        }
    }

    /// Ordered (counterclockwise) ring of neighbor vertices around `v`.
    ///
    /// For boundary vertices the ring runs from one hull edge to the other
    /// and includes both endpoints.
    #[must_use]
    pub fn neighbor_ring(&self, v: usize) -> Vec<usize> {
        let start = self.fan_start(v);
        let mut ring = Vec::new();
        let mut t = start;
        loop {
            let i = self.cells[t]
                .local_index_of(v)
                .expect("fan cell must contain its vertex");
            ring.push(self.cells[t].vertices[(i + 1) % 3]);
            match self.ccw_step(t, v) {
                Some(next) if next != start => t = next,
                Some(_) => break, // interior fan closed
                None => {
                    // Boundary fan: close the ring with the far edge vertex
                    ring.push(self.cells[t].vertices[(i + 2) % 3]);
                    break;
                }
            }
        }
        ring
    }

    /// Returns true if `v` lies on the hull boundary.
    #[must_use]
    pub fn is_boundary(&self, v: usize) -> bool {
        if !D::HAS_BOUNDARY {
            return false;
        }
        let start = self.vertex_cell[v];
        let mut t = start;
        loop {
            match self.cw_step(t, v) {
                Some(next) if next != start => t = next,
                Some(_) => return false,
                None => return true,
            }
        }
    }

    /// All undirected edges, each reported once as `(low, high)`.
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for cell in &self.cells {
            for k in 0..3 {
                let (a, b) = cell.edge(k);
                let key = (a.min(b), a.max(b));
                if seen.insert(key) {
                    out.push(key);
                }
            }
        }
        out
    }

    /// Checks structural invariants: symmetric neighbor links over shared
    /// edges and counterclockwise orientation of every cell.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::DegenerateGeometry`] describing the first
    /// violated invariant.
    pub fn validate(&self) -> InterpResult<()> {
        for (t, cell) in self.cells.iter().enumerate() {
            let [a, b, c] = self.corners(t);
            if D::orient(a, b, c) <= 0.0 {
                return Err(InterpError::DegenerateGeometry {
                    reason: format!("cell {t} is not counterclockwise"),
                });
            }
            for k in 0..3 {
                let Some(u) = cell.neighbors[k] else { continue };
                let (e0, e1) = cell.edge(k);
                let partner = &self.cells[u];
                let back = (0..3).any(|j| {
                    partner.neighbors[j] == Some(t) && {
                        let (f0, f1) = partner.edge(j);
                        f0 == e1 && f1 == e0
                    }
                });
                if !back {
                    return Err(InterpError::DegenerateGeometry {
                        reason: format!("asymmetric adjacency between cells {t} and {u}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Derives neighbor links for a cell soup by matching undirected edges,
/// returning the unmatched edges as hull.
///
/// # Errors
///
/// Returns [`InterpError::DegenerateGeometry`] if any edge is incident to
/// more than two cells.
pub(crate) fn link_neighbors(cells: &mut [TriangleCell]) -> InterpResult<Vec<HullEdge>> {
    let mut incidence: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
    for (t, cell) in cells.iter().enumerate() {
        for k in 0..3 {
            let (a, b) = cell.edge(k);
            incidence
                .entry((a.min(b), a.max(b)))
                .or_default()
                .push((t, k));
        }
    }

    let mut hull = Vec::new();
    for ((a, b), slots) in incidence {
        match slots.as_slice() {
            [(t, k)] => {
                let (from, to) = cells[*t].edge(*k);
                hull.push(HullEdge {
                    from,
                    to,
                    cell: *t,
                });
            }
            [(t, k), (u, j)] => {
                cells[*t].neighbors[*k] = Some(*u);
                cells[*u].neighbors[*j] = Some(*t);
            }
            _ => {
                return Err(InterpError::DegenerateGeometry {
                    reason: format!("edge ({a}, {b}) is shared by more than two cells"),
                });
            }
        }
    }
    Ok(hull)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::coords::Point2;
    use crate::geometry::domain::Planar;

    /// Two triangles sharing the diagonal of the unit square.
    fn square_mesh() -> MeshArena<Planar> {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        MeshArena::from_cells(points, vec![[0, 1, 2], [0, 2, 3]]).expect("valid mesh")
    }

    #[test]
    fn test_from_cells_links_shared_edge() {
        let mesh = square_mesh();
        assert_eq!(mesh.ncells(), 2);
        // The shared edge (0, 2) links the two cells
        let n0: Vec<_> = mesh.cell(0).neighbors.iter().flatten().collect();
        assert_eq!(n0, vec![&1]);
        let n1: Vec<_> = mesh.cell(1).neighbors.iter().flatten().collect();
        assert_eq!(n1, vec![&0]);
    }

    #[test]
    fn test_hull_of_square() {
        let mesh = square_mesh();
        assert_eq!(mesh.hull().len(), 4, "square boundary has 4 edges");
        let mut hull_pairs: Vec<_> = mesh
            .hull()
            .iter()
            .map(|e| (e.from.min(e.to), e.from.max(e.to)))
            .collect();
        hull_pairs.sort_unstable();
        assert_eq!(hull_pairs, vec![(0, 1), (0, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_neighbor_ring_boundary_vertex() {
        let mesh = square_mesh();
        // Vertex 0 sits on the hull; its ring spans 1 -> 2 -> 3 in ccw order
        assert_eq!(mesh.neighbor_ring(0), vec![1, 2, 3]);
        assert!(mesh.is_boundary(0));
    }

    #[test]
    fn test_interior_vertex_ring() {
        // Four triangles around a center vertex
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(-1.0, -1.0),
        ];
        let mesh: MeshArena<Planar> = MeshArena::from_cells(
            points,
            vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 1]],
        )
        .expect("valid fan");

        assert!(!mesh.is_boundary(0));
        let ring = mesh.neighbor_ring(0);
        assert_eq!(ring.len(), 4);
        // Ring must be a ccw rotation of 1, 2, 3, 4
        let offset = ring.iter().position(|&v| v == 1).unwrap();
        let rotated: Vec<_> = (0..4).map(|i| ring[(offset + i) % 4]).collect();
        assert_eq!(rotated, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_edges_are_deduplicated() {
        let mesh = square_mesh();
        let mut edges = mesh.edges();
        edges.sort_unstable();
        assert_eq!(edges, vec![(0, 1), (0, 2), (0, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_validate_accepts_square() {
        let mesh = square_mesh();
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_clockwise_cell() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let mesh: MeshArena<Planar> =
            MeshArena::from_cells(points, vec![[0, 2, 1]]).expect("assembles");
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_from_cells_rejects_overshared_edge() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ];
        let result: InterpResult<MeshArena<Planar>> =
            MeshArena::from_cells(points, vec![[0, 1, 2], [0, 1, 3], [0, 1, 4]]);
        assert!(matches!(
            result,
            Err(InterpError::DegenerateGeometry { .. })
        ));
    }
}
