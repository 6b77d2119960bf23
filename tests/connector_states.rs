// tests/connector_states.rs
use proptest::prelude::*;
use proptest::sample::Index;
use rf_assembly::{Assembly, AssemblyConfig, EdgeTo, FlipCode, Frame};

fn states(assembly: &Assembly) -> Vec<(bool, bool)> {
    assembly
        .elements()
        .map(|(_, e)| (e.connector_1_state(), e.connector_2_state()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Connectors only ever go from open to closed, and every module adds
    /// exactly one neighbour edge and two parent edges.
    #[test]
    fn connectors_close_monotonically(
        steps in prop::collection::vec((any::<Index>(), 0usize..4, -180.0f32..180.0, -0.1f32..0.1), 1..24)
    ) {
        let config = AssemblyConfig::default();
        let origin = config.rod(Frame::world_xy());
        let mut assembly = Assembly::with_elements(config, [origin]);

        for (pick, flip, angle, shift) in steps {
            let open: Vec<_> = assembly
                .elements()
                .filter(|(_, e)| e.has_open_connector())
                .map(|(k, _)| k)
                .collect();
            if open.is_empty() {
                break;
            }
            let key = *pick.get(&open);
            let before = states(&assembly);
            let edges_before = assembly.number_of_connections();

            let keys = assembly
                .close_rf_unit(key, FlipCode::ALL[flip], angle, shift)
                .unwrap();
            prop_assert_eq!(keys.keys_robot.len(), 1);
            prop_assert_eq!(keys.keys_human.len(), 1);

            let after = states(&assembly);
            prop_assert_eq!(after.len(), before.len() + 2);
            for (old, new) in before.iter().zip(&after) {
                prop_assert!(old.0 || !new.0, "connector 1 reopened");
                prop_assert!(old.1 || !new.1, "connector 2 reopened");
            }
            // The attachment element always loses a connector.
            prop_assert_ne!(before[key], after[key]);

            let added: Vec<_> = assembly
                .connections()
                .skip(edges_before)
                .map(|c| c.attributes.edge_to)
                .collect();
            prop_assert_eq!(
                added,
                vec![Some(EdgeTo::Neighbour), Some(EdgeTo::Parent), Some(EdgeTo::Parent)]
            );

            for (k, e, attrs) in assembly.elements_with_attributes() {
                prop_assert_eq!(attrs.has_open_connector, e.has_open_connector(), "key {}", k);
            }
        }
    }
}
