//! Integration tests for grids built from hexagonal and radial point sets.

use approx::assert_relative_eq;
use dualgrid::prelude::*;

fn nodes(ids: &[usize]) -> Vec<NodeId> {
    ids.iter().copied().map(NodeId::new).collect()
}

// =============================================================================
// HEXAGONAL GRIDS
// =============================================================================

#[test]
fn test_small_hex_grid_links_point_up_and_right() {
    let grid = VoronoiDelaunayGrid::hex(3, 2, 1.0, &GridOptions::default()).unwrap();

    assert_eq!(grid.number_of_nodes(), 7);
    assert_eq!(grid.number_of_links(), 12);
    assert_eq!(grid.number_of_patches(), 6);
    assert_eq!(
        grid.node_at_link_tail(),
        nodes(&[0, 0, 0, 1, 1, 2, 3, 2, 3, 3, 4, 5]).as_slice()
    );
    assert_eq!(
        grid.node_at_link_head(),
        nodes(&[1, 2, 3, 3, 4, 3, 4, 5, 5, 6, 6, 6]).as_slice()
    );
    for &length in grid.length_of_link() {
        assert_relative_eq!(length, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_small_hex_grid_cell_is_a_regular_hexagon() {
    let grid = VoronoiDelaunayGrid::hex(3, 2, 1.0, &GridOptions::default()).unwrap();

    assert_eq!(grid.core_nodes(), nodes(&[3]).as_slice());
    assert_eq!(grid.number_of_active_links(), 6);
    assert_relative_eq!(grid.area_of_cell()[0], 3.0f64.sqrt() / 2.0, epsilon = 1e-9);
    for &width in grid.width_of_face() {
        assert_relative_eq!(width, 1.0 / 3.0f64.sqrt(), epsilon = 1e-9);
    }
    assert_eq!(grid.links_at_node().row(3).len(), 6);
}

#[test]
fn test_unoriented_links_keep_backend_direction_but_same_pairs() {
    let options = GridOptionsBuilder::default().reorient_links(false).build().unwrap();
    let oriented = VoronoiDelaunayGrid::hex(4, 3, 1.0, &GridOptions::default()).unwrap();
    let raw = VoronoiDelaunayGrid::hex(4, 3, 1.0, &options).unwrap();

    assert_eq!(oriented.number_of_links(), raw.number_of_links());
    for link in 0..raw.number_of_links() {
        let mut a = [oriented.node_at_link_tail()[link], oriented.node_at_link_head()[link]];
        let mut b = [raw.node_at_link_tail()[link], raw.node_at_link_head()[link]];
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
}

#[test]
fn test_larger_hex_grid_counts() {
    let grid = VoronoiDelaunayGrid::hex(5, 3, 2.0, &GridOptions::default()).unwrap();

    // rows of 3, 4, 5, 4, 3 nodes; every interior node owns a hexagonal cell
    assert_eq!(grid.number_of_nodes(), 19);
    assert_eq!(grid.number_of_cells(), 7);
    let hexagon_area = 3.0f64.sqrt() / 2.0 * 4.0;
    for &area in grid.area_of_cell() {
        assert_relative_eq!(area, hexagon_area, epsilon = 1e-9);
    }
    // 7 cells with 6 faces, 12 shared faces between neighbouring cells
    assert_eq!(grid.number_of_faces(), 7 * 6 - 12);
}

// =============================================================================
// RADIAL GRIDS
// =============================================================================

#[test]
fn test_radial_grid_counts() {
    let one = VoronoiDelaunayGrid::radial(1, 1.0, [0.0, 0.0], &GridOptions::default()).unwrap();
    assert_eq!(one.number_of_nodes(), 7);
    assert_eq!(one.number_of_links(), 12);
    assert_eq!(one.number_of_cells(), 1);
    assert_eq!(one.number_of_active_links(), 6);

    let two = VoronoiDelaunayGrid::radial(2, 1.0, [5.0, -2.0], &GridOptions::default()).unwrap();
    assert_eq!(two.number_of_nodes(), 20);
    assert_eq!(two.number_of_cells(), 7);
    assert_eq!(two.boundary_nodes().len(), 13);
}

#[test]
fn test_radial_shell_structure_survives_node_sorting() {
    let one = RadialLayout::new(1, 1.0, [0.0, 0.0]).unwrap();
    assert_eq!(one.number_of_shells(), 1);
    assert_eq!(one.number_of_nodes_in_shell(), &[6]);
    let grid = VoronoiDelaunayGrid::from_radial_layout(&one, &GridOptions::default()).unwrap();
    assert_eq!(grid.number_of_nodes(), one.number_of_points());
    let radius = one.radius_at_node(grid.xy_of_node());
    assert_eq!(radius[grid.core_nodes()[0].index()], 0.0);
    assert_eq!(radius.iter().filter(|&&r| r == 1.0).count(), 6);

    let two = RadialLayout::new(2, 1.0, [5.0, -2.0]).unwrap();
    assert_eq!(two.number_of_nodes_in_shell(), &[6, 13]);
    assert_eq!(two.radius_to_shell(), vec![1.0, 2.0]);
    let grid = VoronoiDelaunayGrid::from_radial_layout(&two, &GridOptions::default()).unwrap();
    assert_eq!(grid.number_of_nodes(), 20);
    let radius = two.radius_at_node(grid.xy_of_node());
    for node in grid.core_nodes() {
        assert!(radius[node.index()] <= 1.0);
    }
    for node in grid.boundary_nodes() {
        assert_eq!(radius[node.index()], 2.0);
    }
}

#[test]
fn test_radial_center_cell_area() {
    let grid = VoronoiDelaunayGrid::radial(1, 2.0, [0.0, 0.0], &GridOptions::default()).unwrap();
    let center = grid.core_nodes()[0];

    assert_relative_eq!(grid.node_x()[center.index()], 0.0, epsilon = 1e-12);
    assert_relative_eq!(grid.node_y()[center.index()], 0.0, epsilon = 1e-12);
    // regular hexagon with apothem 1
    assert_relative_eq!(grid.area_of_cell()[0], 2.0 * 3.0f64.sqrt(), epsilon = 1e-9);
}

#[test]
fn test_generator_errors_surface_as_construction_errors() {
    let err = VoronoiDelaunayGrid::radial(0, 1.0, [0.0, 0.0], &GridOptions::default()).unwrap_err();
    assert!(matches!(err, ConstructionError::PointGeneration(_)));
    let err = VoronoiDelaunayGrid::hex(3, 2, -1.0, &GridOptions::default()).unwrap_err();
    assert!(matches!(err, ConstructionError::PointGeneration(_)));
}
