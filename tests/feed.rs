// tests/feed.rs
use glam::Vec3;
use rf_assembly::{BaseMap, Error, Frame, ReachabilityFeed};
use std::sync::mpsc;

fn message(resolution: f32, ri: f32) -> String {
    let spheres: Vec<String> = [0.0f32, 0.1, 0.2]
        .iter()
        .map(|x| {
            format!(
                r#"{{"point": {{"x": {x}, "y": 0.0, "z": 0.0}}, "ri": {ri},
                    "poses": [{{"position": {{"x": {x}, "y": 0.0, "z": 0.0}},
                                "orientation": {{"w": 1.0, "x": 0.0, "y": 0.0, "z": 0.0}}}}]}}"#
            )
        })
        .collect();
    format!(
        r#"{{"header": {{"frame_id": "base_link"}}, "resolution": {resolution}, "WsSpheres": [{}]}}"#,
        spheres.join(",")
    )
}

#[test]
fn test_empty_feed_has_no_dataset() {
    let feed = ReachabilityFeed::new();
    assert!(feed.snapshot().is_none());

    let mut base_map = BaseMap::new();
    let result = feed.score_base_pose(&mut base_map, &Frame::world_xy(), &[Vec3::ZERO], None);
    assert!(matches!(result, Err(Error::NoDataset)));
}

#[test]
fn test_snapshot_survives_replacement() {
    let feed = ReachabilityFeed::new();
    feed.apply_message(&message(0.1, 50.0)).unwrap();

    let before = feed.snapshot().unwrap();
    feed.apply_message(&message(0.1, 80.0)).unwrap();
    let after = feed.snapshot().unwrap();

    assert_eq!(before.spheres[0].ri, 50.0);
    assert_eq!(after.spheres[0].ri, 80.0);
    assert_eq!(before.spheres.len(), 3);
    assert_eq!(before.header["frame_id"], "base_link");
}

#[test]
fn test_invalid_update_keeps_previous_dataset() {
    let feed = ReachabilityFeed::new();
    feed.apply_message(&message(0.1, 50.0)).unwrap();

    assert!(matches!(
        feed.apply_message(&message(0.0, 99.0)),
        Err(Error::InvalidResolution(_))
    ));
    assert!(matches!(feed.apply_message("{not json"), Err(Error::Json(_))));

    assert_eq!(feed.require_snapshot().unwrap().spheres[0].ri, 50.0);
}

#[test]
fn test_scoring_uses_current_dataset() {
    let feed = ReachabilityFeed::new();
    feed.apply_message(&message(0.1, 50.0)).unwrap();

    let mut base_map = BaseMap::new();
    let goals = [Vec3::new(0.1, 0.0, 0.0)];
    let (key, detail) = feed
        .score_base_pose(&mut base_map, &Frame::world_xy(), &goals, None)
        .unwrap();
    assert_eq!(detail.mean_reachability_index, 50.0);

    feed.apply_message(&message(0.1, 70.0)).unwrap();
    let (again, detail) = feed
        .score_base_pose(&mut base_map, &Frame::world_xy(), &goals, None)
        .unwrap();
    assert_eq!(key, again);
    assert_eq!(detail.mean_reachability_index, 70.0);
}

#[test]
fn test_listener_applies_until_disconnect() {
    let feed = ReachabilityFeed::new();
    let (tx, rx) = mpsc::channel();
    let listener = feed.spawn_listener(rx);

    tx.send(message(0.1, 10.0)).unwrap();
    tx.send("garbage".to_string()).unwrap();
    tx.send(message(-1.0, 20.0)).unwrap();
    tx.send(message(0.1, 30.0)).unwrap();
    drop(tx);

    assert_eq!(listener.join(), 2);
    assert_eq!(feed.snapshot().unwrap().spheres[0].ri, 30.0);
}

#[test]
fn test_listener_stops_on_request() {
    let feed = ReachabilityFeed::new();
    let (tx, rx) = mpsc::channel::<String>();
    let listener = feed.spawn_listener(rx);

    assert_eq!(listener.stop(), 0);
    assert!(feed.snapshot().is_none());
    drop(tx);
}
