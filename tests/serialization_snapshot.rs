//! Integration tests for saving and restoring grids through serde.

use approx::assert_relative_eq;
use dualgrid::prelude::*;

fn assert_same_tables(a: &VoronoiDelaunayGrid, b: &VoronoiDelaunayGrid) {
    assert_eq!(a.node_x(), b.node_x());
    assert_eq!(a.node_y(), b.node_y());
    assert_eq!(a.status_at_node(), b.status_at_node());
    assert_eq!(a.node_at_link_tail(), b.node_at_link_tail());
    assert_eq!(a.node_at_link_head(), b.node_at_link_head());
    assert_eq!(a.active_links(), b.active_links());
    assert_eq!(a.node_at_cell(), b.node_at_cell());
    assert_eq!(a.links_at_node(), b.links_at_node());
    assert_eq!(a.active_inlinks_at_node(), b.active_inlinks_at_node());
    assert_eq!(a.nodes_at_patch(), b.nodes_at_patch());
    assert_eq!(a.patches(), b.patches());
    for (x, y) in a.width_of_face().iter().zip(b.width_of_face()) {
        assert_relative_eq!(*x, *y, max_relative = 1e-15);
    }
    for (x, y) in a.area_of_cell().iter().zip(b.area_of_cell()) {
        assert_relative_eq!(*x, *y, max_relative = 1e-15);
    }
}

#[test]
fn test_json_round_trip_of_lattice_grid() {
    let grid =
        VoronoiDelaunayGrid::rectangular_lattice((4, 6), 10.0, &GridOptions::default()).unwrap();
    let json = serde_json::to_string(&grid.to_snapshot()).unwrap();
    let snapshot: GridSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot, grid.to_snapshot());

    let restored = VoronoiDelaunayGrid::from_snapshot(snapshot).unwrap();
    assert_same_tables(&grid, &restored);
}

#[test]
fn test_json_round_trip_keeps_boundary_changes() {
    let points = random_points_seeded(60, (0.0, 1.0), (0.0, 1.0), 99).unwrap();
    let mut grid = VoronoiDelaunayGrid::from_points(&points, &GridOptions::default()).unwrap();
    let corner = grid.boundary_nodes()[0];
    grid.set_status_at_node(corner, NodeStatus::Closed).unwrap();

    let json = serde_json::to_string_pretty(&grid.to_snapshot()).unwrap();
    let restored =
        VoronoiDelaunayGrid::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(restored.status_at_node()[corner.index()], NodeStatus::Closed);
    assert_eq!(restored.degeneracies(), grid.degeneracies());
    assert_same_tables(&grid, &restored);
}

#[test]
fn test_element_ids_serialize_as_plain_integers() {
    assert_eq!(serde_json::to_string(&NodeId::new(7)).unwrap(), "7");
    let links: Vec<LinkId> = serde_json::from_str("[3, 1, 4]").unwrap();
    assert_eq!(links, vec![LinkId::new(3), LinkId::new(1), LinkId::new(4)]);
}

#[test]
fn test_tampered_snapshots_are_rejected() {
    let grid =
        VoronoiDelaunayGrid::rectangular_lattice((3, 4), 1.0, &GridOptions::default()).unwrap();

    let mut snapshot = grid.to_snapshot();
    snapshot.node_y.pop();
    assert!(matches!(
        VoronoiDelaunayGrid::from_snapshot(snapshot),
        Err(SnapshotError::LengthMismatch { what: "node_y", .. })
    ));

    let mut snapshot = grid.to_snapshot();
    snapshot.node_at_link_head[0] = NodeId::new(99);
    assert!(matches!(
        VoronoiDelaunayGrid::from_snapshot(snapshot),
        Err(SnapshotError::NodeOutOfRange { what: "node_at_link_head", .. })
    ));

    let mut snapshot = grid.to_snapshot();
    snapshot.area_of_cell[1] = -2.0;
    assert!(matches!(
        VoronoiDelaunayGrid::from_snapshot(snapshot),
        Err(SnapshotError::InvalidCellArea { .. })
    ));
}

#[test]
fn test_snapshots_with_unusable_geometry_are_rejected() {
    let grid =
        VoronoiDelaunayGrid::rectangular_lattice((3, 4), 1.0, &GridOptions::default()).unwrap();
    let with_face = grid
        .to_snapshot()
        .ridge_width_at_link
        .iter()
        .position(Option::is_some)
        .unwrap();

    let mut snapshot = grid.to_snapshot();
    snapshot.node_at_link_head[8] = snapshot.node_at_link_tail[8];
    assert!(matches!(
        VoronoiDelaunayGrid::from_snapshot(snapshot),
        Err(SnapshotError::DegenerateLink { link }) if link == LinkId::new(8)
    ));

    for width in [f64::NAN, f64::INFINITY, -1.0] {
        let mut snapshot = grid.to_snapshot();
        snapshot.ridge_width_at_link[with_face] = Some(width);
        assert!(matches!(
            VoronoiDelaunayGrid::from_snapshot(snapshot),
            Err(SnapshotError::InvalidRidgeWidth { link, .. }) if link.index() == with_face
        ));
    }

    let mut snapshot = grid.to_snapshot();
    snapshot.max_region_degree = usize::MAX / 2;
    assert_eq!(
        VoronoiDelaunayGrid::from_snapshot(snapshot).unwrap_err(),
        SnapshotError::RegionDegreeOutOfRange {
            max_region_degree: usize::MAX / 2,
            number_of_nodes: 12,
        }
    );
}
