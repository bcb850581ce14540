//! Integration tests for rejected inputs and status changes.

use dualgrid::prelude::*;

// =============================================================================
// CONSTRUCTION
// =============================================================================

#[test]
fn test_mismatched_coordinates() {
    let err = VoronoiDelaunayGrid::new(&[0.0, 1.0, 2.0], &[0.0, 1.0]).unwrap_err();
    assert_eq!(err, ConstructionError::CoordinateLengthMismatch { x_len: 3, y_len: 2 });
    assert!(err.to_string().contains("3 x values"));
}

#[test]
fn test_non_finite_coordinates() {
    let x = [0.0, 1.0, f64::INFINITY, 0.0, 1.0];
    let y = [0.0, 0.0, 0.0, 1.0, 1.0];
    let err = VoronoiDelaunayGrid::new(&x, &y).unwrap_err();
    assert!(matches!(err, ConstructionError::NonFiniteCoordinate { index: 2, .. }));
}

#[test]
fn test_too_few_points() {
    let err = VoronoiDelaunayGrid::new(&[0.0, 1.0], &[0.0, 1.0]).unwrap_err();
    assert!(matches!(err, ConstructionError::TooFewPoints { count: 2, .. }));
}

#[test]
fn test_points_without_interior_have_no_cells() {
    // a triangle and a square: every node is on the perimeter
    let err = VoronoiDelaunayGrid::new(&[0.0, 1.0, 0.5], &[0.0, 0.0, 1.0]).unwrap_err();
    assert!(matches!(err, ConstructionError::NoCells { number_of_nodes: 3 }));
    let err = VoronoiDelaunayGrid::new(&[0.0, 1.0, 0.0, 1.0], &[0.0, 0.0, 1.0, 1.0]).unwrap_err();
    assert!(matches!(err, ConstructionError::NoCells { .. }));
}

#[test]
fn test_invalid_options_are_rejected_by_the_builder() {
    assert!(GridOptionsBuilder::default().ridge_magnitude_limit(0.0).build().is_err());
    assert!(GridOptionsBuilder::default().vertex_merge_tolerance(f64::NAN).build().is_err());
    let options = GridOptionsBuilder::default().collinear_tolerance(0.0).build().unwrap();
    assert!(options.reorient_links);
}

// =============================================================================
// STATUS CHANGES
// =============================================================================

#[test]
fn test_status_change_errors() {
    let mut grid =
        VoronoiDelaunayGrid::rectangular_lattice((3, 3), 1.0, &GridOptions::default()).unwrap();

    assert_eq!(
        grid.set_status_at_node(NodeId::new(4), NodeStatus::Closed),
        Err(BoundaryStatusError::CoreNode { node: NodeId::new(4) })
    );
    assert_eq!(
        grid.set_status_at_node(NodeId::new(0), NodeStatus::Core),
        Err(BoundaryStatusError::ToCore { node: NodeId::new(0) })
    );
    assert!(matches!(
        grid.set_status_at_node(NodeId::new(9), NodeStatus::Closed),
        Err(BoundaryStatusError::NodeOutOfRange { number_of_nodes: 9, .. })
    ));

    // a failing batch changes nothing
    let before = grid.status_at_node().to_vec();
    assert!(
        grid.set_status_at_nodes(&[
            (NodeId::new(1), NodeStatus::Closed),
            (NodeId::new(4), NodeStatus::FixedGradient),
        ])
        .is_err()
    );
    assert_eq!(grid.status_at_node(), before.as_slice());
}

#[test]
fn test_closing_one_side() {
    let mut grid =
        VoronoiDelaunayGrid::rectangular_lattice((3, 3), 1.0, &GridOptions::default()).unwrap();
    let bottom = [0, 1, 2].map(|n| (NodeId::new(n), NodeStatus::Closed));
    grid.set_status_at_nodes(&bottom).unwrap();

    // the link from node 1 up to the core node is gone; three faces remain
    assert_eq!(grid.number_of_active_links(), 3);
    assert_eq!(grid.number_of_faces(), 3);
    assert!(grid.status_at_node()[1].is_closed());

    grid.set_status_at_node(NodeId::new(1), NodeStatus::FixedGradient).unwrap();
    assert_eq!(grid.number_of_active_links(), 4);
}

// =============================================================================
// OPERATOR INPUTS
// =============================================================================

#[test]
fn test_operator_length_errors_name_the_argument() {
    let grid =
        VoronoiDelaunayGrid::rectangular_lattice((3, 3), 1.0, &GridOptions::default()).unwrap();
    let mut out = vec![0.0; grid.number_of_links()];

    let err = calc_grad_at_link(&grid, &[0.0; 4], &mut out).unwrap_err();
    assert_eq!(
        err,
        OperatorInputError::LengthMismatch { what: "values_at_node", expected: 9, actual: 4 }
    );

    let err = calc_flux_div_at_node(&grid, &[0.0; 4], &mut [0.0; 3]).unwrap_err();
    assert!(matches!(err, OperatorInputError::LengthMismatch { what: "out", .. }));
}
