// tests/export.rs
use glam::Vec3;
use pretty_assertions::assert_eq;
use rf_assembly::{
    Assembly, AssemblyConfig, BuildingStepRecord, EdgeAttributes, FlipCode, Frame, InconExport,
    StepId,
};
use serde_json::Value;

fn module() -> Assembly {
    let config = AssemblyConfig::default();
    let rod = config.rod(Frame::world_xy().translated(Vec3::new(0.0, 0.0, 0.5)));
    let mut assembly = Assembly::with_elements(config, [rod]);
    assembly.close_rf_unit(0, FlipCode::AA, 0.0, 0.0).unwrap();
    assembly
}

#[test]
fn test_line_protocol() {
    let assembly = module();
    let marker = Frame::world_xy().translated(Vec3::new(1.0, 2.0, 3.0));

    let steps = assembly.export_building_plan(&[marker]);
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0].step_type, "GM");
    assert_eq!(steps[0].pose, [1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0]);
    assert_eq!(steps[2].annotation, "This is the element with the key index 1");

    let mut out = Vec::new();
    assembly.write_building_plan(&[marker], &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("GM,1,2,3,1,0,0,0,"));
    assert!(lines[1].ends_with("key index 0"));
    assert_eq!(lines[1].split(',').count(), 9);
}

#[test]
fn test_structured_plan() {
    let mut assembly = module();
    assembly.attributes_mut(1).unwrap().color = Some([0.0, 1.0, 0.0]);

    let options = InconExport {
        tags: vec![Frame::world_xy()],
        ..Default::default()
    };
    let plan = assembly.export_incon(&options);

    // starting material, three rods, placeholder pool, one tag
    assert_eq!(plan.building_steps.len(), 6);
    assert_eq!(plan.id, "iaac_plan");

    match &plan.building_steps[2] {
        BuildingStepRecord::Object(step) => {
            assert_eq!(step.id, StepId::Key(1));
            assert_eq!(step.color_rgb, [0.0, 1.0, 0.0]);
            assert!(step.is_already_built);
        }
        other => panic!("expected an object step, got {other:?}"),
    }
    match &plan.building_steps[4] {
        BuildingStepRecord::Object(step) => assert_eq!(step.instances, Some(200)),
        other => panic!("expected the placeholder pool, got {other:?}"),
    }

    let json: Value = serde_json::from_str(&plan.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["building_steps"][0]["type"], "object");
    assert_eq!(json["building_steps"][0]["id"], "starting element");
    assert_eq!(json["building_steps"][1]["id"], 0);
    assert_eq!(json["building_steps"][5]["type"], "tag");
    assert_eq!(
        json["building_steps"][1]["pose"]["position"],
        serde_json::json!([0.0, 0.0, 0.5])
    );

    let bare = assembly.export_incon(&InconExport {
        starting_geometry: false,
        placeholder: None,
        ..Default::default()
    });
    assert_eq!(bare.building_steps.len(), 3);
}

#[test]
fn test_assembly_json_roundtrip() {
    let mut assembly = module();
    assembly.set_name("pavilion");
    assembly.attributes_mut(2).unwrap().course = Some(3);

    let restored = Assembly::from_json(&assembly.to_json().unwrap()).unwrap();
    assert_eq!(restored.name(), "pavilion");
    assert_eq!(restored.number_of_elements(), 3);
    assert_eq!(restored.number_of_connections(), 3);
    assert_eq!(restored.element(0).unwrap(), assembly.element(0).unwrap());
    assert_eq!(restored.attributes(2).unwrap(), assembly.attributes(2).unwrap());
    assert_eq!(restored.neighbors(0).unwrap(), vec![1, 2]);
}

#[test]
fn test_dangling_edge_is_rejected() {
    let mut assembly = module();
    let mut json: Value = serde_json::from_str(&assembly.to_json().unwrap()).unwrap();
    json["edges"][0]["v"] = Value::from(99);
    assert!(Assembly::from_json(&json.to_string()).is_err());

    assert!(assembly.add_connection(0, 99, EdgeAttributes::default()).is_err());
}

#[test]
fn test_xr_export_adds_viewer_attributes() {
    let mut assembly = module();
    assembly.attributes_mut(1).unwrap().course = Some(4);

    let json: Value = serde_json::from_str(&assembly.to_xr_json(false).unwrap()).unwrap();
    let nodes = json["nodes"].as_array().unwrap();
    assert_eq!(nodes[1]["attributes"]["custom"]["idx_v"], 4);
    assert_eq!(nodes[0]["attributes"]["custom"]["idx_v"], Value::Null);
    assert!(nodes.iter().all(|n| n["attributes"]["is_built"] == false));

    // The source assembly is not modified.
    assert!(assembly.attributes(1).unwrap().is_built);
    assert!(assembly.attributes(1).unwrap().custom.is_empty());
}
