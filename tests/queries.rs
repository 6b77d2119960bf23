// tests/queries.rs
use glam::Vec3;
use rf_assembly::{
    Assembly, AssemblyConfig, ConnectorFilter, FlipCode, Frame, JointDescriptor, JointType, Line,
};

fn setup() -> (Assembly, f32) {
    let config = AssemblyConfig::default();
    let offset = config.connector_offset();
    let origin = config.rod(Frame::world_xy());
    (Assembly::with_elements(config, [origin]), offset)
}

#[test]
fn test_parent_key_only_sees_open_connectors() {
    let (mut assembly, o) = setup();
    let c1 = Vec3::new(-o, 0.0, 0.0);

    assert_eq!(assembly.parent_key(c1, 0.01), Some(0));
    assert_eq!(assembly.parent_key(Vec3::new(5.0, 0.0, 0.0), 0.01), None);

    // After a module, every connector meeting at c1 is closed.
    assembly.close_rf_unit(0, FlipCode::AA, 0.0, 0.0).unwrap();
    assert_eq!(assembly.parent_key(c1, 0.01), None);
    assert_eq!(assembly.parent_key(Vec3::new(o, 0.0, 0.0), 0.01), Some(0));

    let open = assembly.connectors(ConnectorFilter::Open);
    assert_eq!(open.len(), 3);
    assert!(open.iter().all(|(_, frames)| frames.len() == 1));
    let closed = assembly.connectors(ConnectorFilter::Closed);
    assert!(closed.iter().all(|(_, frames)| frames.len() == 1));
}

#[test]
fn test_range_filter_closes_unreachable_connectors() {
    let (mut assembly, _) = setup();
    let base = Frame::world_xy().translated(Vec3::new(1.3, 0.0, 0.0));

    // First connector is 1.3 + offset away; the second is within the band.
    assert_eq!(assembly.range_filter_default(&base), 1);
    let origin = assembly.element(0).unwrap();
    assert!(!origin.connector_1_state());
    assert!(origin.connector_2_state());

    assert_eq!(assembly.range_filter_default(&base), 0);
    assert!(assembly.attributes(0).unwrap().has_open_connector);

    // An empty band closes the remaining connector and clears the flag.
    assert_eq!(assembly.range_filter(&base, 10.0, 0.0), 1);
    assert!(!assembly.element(0).unwrap().has_open_connector());
    assert!(!assembly.attributes(0).unwrap().has_open_connector);
    assert_eq!(assembly.range_filter(&base, 10.0, 0.0), 0);
}

#[test]
fn test_distance_and_orientation_to_target() {
    let (assembly, o) = setup();

    let above = Vec3::new(-o, 0.0, 1.0);
    let (distance, vector) = assembly.distance_to_target(0, 0.0, &above).unwrap();
    assert!((distance - 1.0).abs() < 1e-5);
    assert!(vector.distance(Vec3::Z) < 1e-5);

    // Connector Z points straight at the target.
    let (score, _) = assembly.orientation_to_target(0, 0.0, &above).unwrap();
    assert!(score.is_infinite() || score > 1e5);

    let side = Vec3::new(-o, 1.0, 0.0);
    let (score, _) = assembly.orientation_to_target(0, 0.0, &side).unwrap();
    assert!((score - 1.0).abs() < 1e-5);

    // A quarter turn about the rod swings the connector Z onto the Y axis.
    let (score, _) = assembly.orientation_to_target(0, -90.0, &side).unwrap();
    assert!(score > 1e4);

    // Segment targets measure to their closest point.
    let guide = Line::new(Vec3::new(-5.0, 2.0, 0.0), Vec3::new(5.0, 2.0, 0.0));
    let (distance, _) = assembly.distance_to_target(0, 0.0, &guide).unwrap();
    assert!((distance - 2.0).abs() < 1e-5);

    assert!(assembly.distance_to_target(9, 0.0, &above).is_err());
}

#[test]
fn test_housekeeping() {
    let (mut assembly, _) = setup();
    assert_eq!(assembly.name(), "Assembly");

    let second = AssemblyConfig::default().rod(Frame::world_xy().translated(Vec3::Z));
    let key = assembly.add_element(second);
    assembly
        .add_joint(
            0,
            key,
            JointDescriptor {
                joint_type: JointType::Contact,
                anchor: Vec3::new(0.0, 0.0, 0.5),
            },
        )
        .unwrap();
    assert_eq!(assembly.neighbors(key).unwrap(), vec![0]);

    let moved = assembly.transformed(&rf_assembly::translation(Vec3::X));
    assert_eq!(moved.element(0).unwrap().frame.point, Vec3::X);
    assert_eq!(assembly.element(0).unwrap().frame.point, Vec3::ZERO);

    assembly.clear();
    assert_eq!(assembly.number_of_elements(), 0);
    assert_eq!(assembly.number_of_connections(), 0);
    assert_eq!(assembly.last_key(), None);
    assert_eq!(assembly.add_element(AssemblyConfig::default().rod(Frame::world_xy())), 0);
}
