use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use euclid::default::{Point2D, Vector2D};

use graph_replay::model::{EdgeRecord, NodeRecord};
use graph_replay::render::scene::ScenePacket;
use graph_replay::{
    AnimationPreset, ClockPolicy, EngineConfig, EngineEvent, GraphElement, HeadlessBackend,
    LayoutAlgorithm, PlaybackPhase, RenderBackend, ReplayEngine, ReplayError, TimeMs, VERSION,
};

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

fn test_config() -> EngineConfig {
    EngineConfig {
        clock: ClockPolicy::permissive(),
        debounce_ms: 0,
        animation: AnimationPreset::Off,
        layout: LayoutAlgorithm::Circular,
        layout_seed: Some(11),
        ..EngineConfig::default()
    }
}

fn node(id: &str, ts: u64) -> GraphElement {
    GraphElement::Node(NodeRecord::new(id).with_timestamp(ts))
}

fn undated_node(id: &str) -> GraphElement {
    GraphElement::Node(NodeRecord::new(id))
}

fn edge(id: &str, source: &str, target: &str, ts: u64) -> GraphElement {
    GraphElement::Edge(EdgeRecord::new(id, source, target).with_timestamp(ts))
}

/// A(ts=100), B(ts=200), C(no ts), edge A->B(ts=150). Bounds [100, 200].
fn scenario_dataset() -> Vec<GraphElement> {
    vec![
        node("a", 100),
        node("b", 200),
        undated_node("c"),
        edge("ab", "a", "b", 150),
    ]
}

fn pump(engine: &mut ReplayEngine) {
    engine.tick(Instant::now() + Duration::from_millis(1)).expect("tick failed");
}

// --- filtering scenarios ---

#[test]
fn window_covering_edge_pulls_both_endpoints() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(scenario_dataset());

    // A window ending at the edge timestamp keeps the edge alive, and the
    // edge keeps its late endpoint B visible.
    assert!(engine.set_window(TimeMs(100), TimeMs(150)));
    pump(&mut engine);

    let view = engine.view();
    assert!(view.contains_node("a"));
    assert!(view.contains_node("b"), "edge endpoint must be pulled in");
    assert!(view.contains_node("c"), "undated nodes are always visible");
    assert!(view.contains_edge("ab"));
    assert_eq!(view.node_count(), 3);
    assert_eq!(view.edge_count(), 1);
}

#[test]
fn window_between_timestamps_shows_only_undated() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(scenario_dataset());

    assert!(engine.set_window(TimeMs(101), TimeMs(149)));
    pump(&mut engine);

    let view = engine.view();
    assert_eq!(view.node_count(), 1);
    assert!(view.contains_node("c"));
    assert_eq!(view.edge_count(), 0);
}

#[test]
fn out_of_bounds_window_is_rejected_and_prior_retained() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(scenario_dataset());
    pump(&mut engine);
    let before = engine.window().unwrap();

    assert!(!engine.set_window(TimeMs(0), TimeMs(150)), "starts before bounds");
    assert!(!engine.set_window(TimeMs(150), TimeMs(150)), "collapsed window");
    assert!(!engine.set_window(TimeMs(180), TimeMs(120)), "reversed window");
    assert_eq!(engine.window().unwrap(), before);

    pump(&mut engine);
    assert_eq!(engine.view().node_count(), 3, "view unchanged after rejections");
}

#[test]
fn reapplying_same_window_changes_nothing() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(scenario_dataset());
    assert!(engine.set_window(TimeMs(100), TimeMs(150)));
    pump(&mut engine);
    let first: Vec<String> = engine.view().node_ids().cloned().collect();

    assert!(engine.set_window(TimeMs(100), TimeMs(150)));
    pump(&mut engine);
    let second: Vec<String> = engine.view().node_ids().cloned().collect();
    assert_eq!(first, second);
}

// --- playback scenario ---

#[test]
fn playback_advances_then_clamps_and_stops() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(vec![node("start", 0), node("mid", 500), node("end", 1_000)]);
    assert!(engine.set_window(TimeMs(0), TimeMs(100)));
    pump(&mut engine);
    assert!(engine.play());
    engine.drain_events();

    let t0 = Instant::now();
    engine.tick(t0 + Duration::from_millis(1_000)).unwrap();
    let w = engine.window().unwrap();
    assert_eq!((w.start(), w.end()), (TimeMs(10), TimeMs(110)), "one tick is 10% of width");

    let mut now = t0 + Duration::from_millis(1_000);
    let mut guard = 0;
    while engine.playback_state().phase == PlaybackPhase::Playing {
        now += Duration::from_millis(1_000);
        engine.tick(now).unwrap();
        guard += 1;
        assert!(guard < 200, "playback never stopped");
    }

    let w = engine.window().unwrap();
    assert_eq!((w.start(), w.end()), (TimeMs(900), TimeMs(1_000)), "clamped, not overshot");
    let events = engine.drain_events();
    assert!(
        events.iter().any(|e| matches!(
            e,
            EngineEvent::PlaybackChanged { state } if state.phase == PlaybackPhase::Stopped
        )),
        "auto-stop must notify the host"
    );
}

#[test]
fn pause_cancels_pending_ticks() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(vec![node("start", 0), node("end", 1_000)]);
    assert!(engine.set_window(TimeMs(0), TimeMs(100)));
    pump(&mut engine);
    engine.play();
    engine.pause();

    engine.tick(Instant::now() + Duration::from_secs(10)).unwrap();
    let w = engine.window().unwrap();
    assert_eq!((w.start(), w.end()), (TimeMs(0), TimeMs(100)), "no tick after pause");
}

// --- drag persistence scenario ---

#[test]
fn dragged_position_survives_exclusion_and_return() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(vec![node("a", 150), node("b", 100), node("c", 200)]);
    pump(&mut engine);

    // Drag node a to (5,5). Zoom 1 and no pan, so screen space is world space.
    let start = engine.view().node("a").unwrap().position;
    engine.pointer_pressed(start, false);
    engine.pointer_moved(Point2D::new(5.0, 5.0));
    engine.pointer_released(Point2D::new(5.0, 5.0));
    assert_eq!(engine.positions().get("a"), Some(Point2D::new(5.0, 5.0)));

    // Narrow the window so a(ts=150) leaves, then bring it back.
    assert!(engine.set_window(TimeMs(100), TimeMs(149)));
    pump(&mut engine);
    assert!(!engine.view().contains_node("a"));

    assert!(engine.set_window(TimeMs(100), TimeMs(200)));
    pump(&mut engine);
    assert_eq!(
        engine.view().node("a").unwrap().position,
        Point2D::new(5.0, 5.0),
        "no re-layout for a node with a persisted position"
    );
}

// --- debounce ---

#[test]
fn scrubbing_coalesces_into_one_notification() {
    let config = EngineConfig { debounce_ms: 200, ..test_config() };
    let mut engine = ReplayEngine::new(config).unwrap();
    engine.load_elements(scenario_dataset());
    pump(&mut engine);
    engine.drain_events();

    // Three rapid scrub positions; only the last should be notified.
    assert!(engine.set_window(TimeMs(100), TimeMs(120)));
    assert!(engine.set_window(TimeMs(100), TimeMs(130)));
    assert!(engine.set_window(TimeMs(100), TimeMs(150)));
    let scrubbed_at = Instant::now();

    // The window itself updates synchronously.
    assert_eq!(engine.window().unwrap().end(), TimeMs(150));

    // Before the quiet period ends nothing is emitted.
    engine.tick(scrubbed_at).unwrap();
    assert!(engine.drain_events().is_empty());

    engine.tick(scrubbed_at + Duration::from_millis(500)).unwrap();
    let events = engine.drain_events();
    let windows: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::WindowChanged { window, .. } => Some(*window),
            _ => None,
        })
        .collect();
    assert_eq!(windows.len(), 1, "superseded notifications coalesce");
    assert_eq!(windows[0].end(), TimeMs(150));
}

// --- camera and teardown ---

#[test]
fn camera_survives_data_reload() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(scenario_dataset());
    pump(&mut engine);

    engine.camera_mut().set_zoom(2.5);
    engine.camera_mut().set_pan(Vector2D::new(40.0, -10.0));

    engine.load_elements(scenario_dataset());
    pump(&mut engine);
    assert_eq!(engine.camera().zoom(), 2.5);
    assert_eq!(engine.camera().pan(), Vector2D::new(40.0, -10.0));
}

#[test]
fn teardown_releases_callbacks() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.load_elements(scenario_dataset());
    pump(&mut engine);

    let clicks: Rc<RefCell<u32>> = Rc::default();
    let sink = clicks.clone();
    engine.on_node_click(move |_| *sink.borrow_mut() += 1);

    let position = engine.view().node("c").unwrap().position;
    engine.pointer_pressed(position, false);
    engine.pointer_released(position);
    assert_eq!(*clicks.borrow(), 1);

    engine.teardown();
    engine.pointer_pressed(position, false);
    engine.pointer_released(position);
    assert_eq!(*clicks.borrow(), 1, "no callbacks after teardown");
}

// --- backend failure ---

#[derive(Default)]
struct BackendProbe {
    mounted: bool,
    frames: u32,
    fail_next_apply: bool,
    last_scene: Option<ScenePacket>,
}

struct SharedBackend {
    probe: Rc<RefCell<BackendProbe>>,
}

impl RenderBackend for SharedBackend {
    fn mount(&mut self) -> Result<(), ReplayError> {
        self.probe.borrow_mut().mounted = true;
        Ok(())
    }

    fn apply(&mut self, scene: &ScenePacket) -> Result<(), ReplayError> {
        let mut probe = self.probe.borrow_mut();
        if probe.fail_next_apply {
            return Err(ReplayError::RenderBackend("surface lost".to_string()));
        }
        probe.frames += 1;
        probe.last_scene = Some(scene.clone());
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), ReplayError> {
        Ok(())
    }

    fn unmount(&mut self) {
        self.probe.borrow_mut().mounted = false;
    }

    fn name(&self) -> &str {
        "probe"
    }
}

#[test]
fn backend_failure_tears_down_and_remount_recovers() {
    let probe: Rc<RefCell<BackendProbe>> = Rc::default();
    let backend = SharedBackend { probe: probe.clone() };
    let mut engine = ReplayEngine::with_backend(test_config(), Box::new(backend)).unwrap();

    engine.load_elements(scenario_dataset());
    pump(&mut engine);
    assert!(probe.borrow().frames > 0);
    assert!(probe.borrow().mounted);

    // The next changed view hits a dead surface.
    engine.play();
    probe.borrow_mut().fail_next_apply = true;
    assert!(engine.set_window(TimeMs(101), TimeMs(149)));
    let result = engine.tick(Instant::now() + Duration::from_millis(1));
    assert!(result.is_err());

    assert!(engine.is_halted());
    assert!(!probe.borrow().mounted, "failed session unmounts the backend");
    assert_eq!(engine.playback_state().phase, PlaybackPhase::Stopped);
    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(e, EngineEvent::BackendFailed { .. })));

    // Recoverable only by a full re-mount.
    engine.remount(Box::new(HeadlessBackend::new())).unwrap();
    assert!(engine.set_window(TimeMs(100), TimeMs(200)));
    pump(&mut engine);
    assert!(!engine.is_halted());
    assert_eq!(engine.view().node_count(), 3);
    assert_eq!(engine.backend_name(), "headless");
}

#[test]
fn scene_packets_carry_sorted_elements_and_delta() {
    let probe: Rc<RefCell<BackendProbe>> = Rc::default();
    let backend = SharedBackend { probe: probe.clone() };
    let mut engine = ReplayEngine::with_backend(test_config(), Box::new(backend)).unwrap();

    engine.load_elements(scenario_dataset());
    pump(&mut engine);

    let probe = probe.borrow();
    let scene = probe.last_scene.as_ref().unwrap();
    let ids: Vec<&str> = scene.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(scene.edges.len(), 1);
    assert_eq!(scene.delta.added.len(), 4, "first frame reports everything as added");
    assert!(scene.delta.removed.is_empty());
}

// --- upstream failure and malformed input ---

#[test]
fn malformed_records_are_counted_not_fatal() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    let report = engine.load_json(vec![
        serde_json::json!({ "type": "node", "id": "a", "timestamp": 100 }),
        serde_json::json!({ "type": "node", "id": "b", "timestamp": 200 }),
        serde_json::json!({ "id": "missing-type" }),
        serde_json::json!({
            "type": "edge", "id": "ab", "sourceId": "a", "targetId": "b", "timestamp": 150
        }),
        serde_json::json!({ "type": "edge", "id": "dangling", "sourceId": "a", "targetId": "ghost" }),
    ]);
    assert_eq!(report.loaded, 3);
    assert_eq!(report.dropped, 2);

    pump(&mut engine);
    assert_eq!(engine.view().node_count(), 2);
    assert_eq!(engine.view().edge_count(), 1);
}

#[test]
fn fetch_failure_keeps_engine_usable() {
    let mut engine = ReplayEngine::new(test_config()).unwrap();
    engine.mark_fetch_failed("upstream offline");
    pump(&mut engine);

    assert!(engine.view().is_empty());
    assert!(!engine.is_halted());
    assert!(engine.dataset().fetch_error().is_some());

    // A later successful load clears the failure.
    engine.load_elements(scenario_dataset());
    pump(&mut engine);
    assert!(engine.dataset().fetch_error().is_none());
    assert_eq!(engine.view().node_count(), 3);
}
