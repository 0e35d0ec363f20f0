//! Cross-cutting properties of the static graph: ordering, round-trips,
//! transform algebra, cache equivalence against a naive reference, and
//! stale-set correctness.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use itertools::Itertools as _;
use tf_types::external::glam::{DQuat, DVec3, EulerRot, dvec3};
use tf_types::{FrameId, RigidTransform};

use tf_graph::TransformGraph;

const EPSILON: f64 = 1e-9;

/// world ─┬─ robot ─┬─ arm ── gripper
///        │         └─ camera
///        └─ beacon
fn robot_scene() -> TransformGraph {
    let mut graph = TransformGraph::new();
    graph.add("world", None, RigidTransform::IDENTITY).unwrap();
    graph
        .add(
            "robot",
            Some("world"),
            RigidTransform::new(
                dvec3(1.0, 0.0, 0.0),
                DQuat::from_axis_angle(DVec3::Z, 0.3),
            ),
        )
        .unwrap();
    graph
        .add(
            "arm",
            Some("robot"),
            RigidTransform::from_translation(dvec3(0.0, 0.5, 0.2)),
        )
        .unwrap();
    graph
        .add(
            "gripper",
            Some("arm"),
            RigidTransform::new(
                dvec3(0.0, 0.0, 0.3),
                DQuat::from_axis_angle(DVec3::X, -0.7),
            ),
        )
        .unwrap();
    graph
        .add(
            "camera",
            Some("robot"),
            RigidTransform::new(
                dvec3(0.0, 0.0, 1.0),
                DQuat::from_euler(EulerRot::XYZ, 0.1, 0.2, 0.3),
            ),
        )
        .unwrap();
    graph
        .add(
            "beacon",
            Some("world"),
            RigidTransform::from_translation(dvec3(0.0, 5.0, 0.0)),
        )
        .unwrap();
    graph
}

fn all_ids(graph: &TransformGraph) -> Vec<String> {
    graph.ids().map(FrameId::to_string).collect_vec()
}

#[test]
fn test_ids_list_parents_before_children() {
    let graph = robot_scene();
    let ids = all_ids(&graph);

    for id in &ids {
        if let Some(parent) = graph.parent(id).unwrap() {
            let parent_position = ids.iter().position(|i| i == parent.as_str()).unwrap();
            let child_position = ids.iter().position(|i| i == id).unwrap();
            assert!(
                parent_position < child_position,
                "parent {parent} must precede child {id}"
            );
        }
    }
}

#[test]
fn test_snapshot_roundtrip_preserves_all_pair_transforms() {
    let mut graph = robot_scene();
    let mut restored = TransformGraph::from_snapshot(&graph.to_snapshot()).unwrap();

    assert_eq!(all_ids(&graph), all_ids(&restored));

    let ids = all_ids(&graph);
    for (from, to) in ids.iter().cartesian_product(ids.iter()) {
        let original = graph.transform_from_to(from, to).unwrap();
        let roundtripped = restored.transform_from_to(from, to).unwrap();
        assert!(
            original.abs_diff_eq(&roundtripped, EPSILON),
            "transform {from} -> {to} changed across snapshot round-trip"
        );
    }
}

#[test]
fn test_self_transform_is_identity() {
    let mut graph = robot_scene();
    for id in all_ids(&graph) {
        let transform = graph.transform_from_to(&id, &id).unwrap();
        assert!(transform.abs_diff_eq(&RigidTransform::IDENTITY, EPSILON));
    }
}

#[test]
fn test_inverse_pairs_compose_to_identity() {
    let mut graph = robot_scene();
    let ids = all_ids(&graph);
    for (from, to) in ids.iter().cartesian_product(ids.iter()) {
        let forward = graph.transform_from_to(from, to).unwrap();
        let backward = graph.transform_from_to(to, from).unwrap();
        assert!(
            (forward * backward).abs_diff_eq(&RigidTransform::IDENTITY, EPSILON),
            "{from} <-> {to} did not invert"
        );
    }
}

#[test]
fn test_transforms_compose_transitively() {
    let mut graph = robot_scene();
    let ids = all_ids(&graph);
    for ((a, b), c) in ids
        .iter()
        .cartesian_product(ids.iter())
        .cartesian_product(ids.iter())
    {
        let a_from_b = graph.transform_from_to(a, b).unwrap();
        let b_from_c = graph.transform_from_to(b, c).unwrap();
        let a_from_c = graph.transform_from_to(a, c).unwrap();
        assert!(
            (a_from_b * b_from_c).abs_diff_eq(&a_from_c, EPSILON),
            "composition through {b} disagreed for {a} -> {c}"
        );
    }
}

/// Reference implementation with no cache: recomputes every world transform
/// by walking the parent chain from scratch.
#[derive(Default)]
struct NaiveGraph {
    frames: HashMap<String, (Option<String>, RigidTransform)>,
}

impl NaiveGraph {
    fn add(&mut self, id: &str, parent: Option<&str>, local: RigidTransform) {
        self.frames
            .insert(id.to_owned(), (parent.map(str::to_owned), local));
    }

    fn set_local(&mut self, id: &str, local: RigidTransform) {
        if let Some((_, transform)) = self.frames.get_mut(id) {
            *transform = local;
        }
    }

    fn world(&self, id: &str) -> RigidTransform {
        let (parent, local) = &self.frames[id];
        match parent {
            None => *local,
            Some(parent) => self.world(parent) * *local,
        }
    }

    fn transform_from_to(&self, from: &str, to: &str) -> RigidTransform {
        self.world(from).inverse() * self.world(to)
    }
}

#[test]
fn test_cached_results_match_naive_recomputation() {
    let mut graph = robot_scene();
    let mut naive = NaiveGraph::default();
    for id in all_ids(&graph) {
        naive.add(
            &id,
            graph.parent(&id).unwrap().map(FrameId::as_str),
            graph.parent_from_frame(&id).unwrap(),
        );
    }

    let steps: Vec<Vec<(&str, RigidTransform)>> = vec![
        vec![(
            "robot",
            RigidTransform::from_translation(dvec3(2.0, 1.0, 0.0)),
        )],
        vec![(
            "gripper",
            RigidTransform::from_rotation(DQuat::from_axis_angle(DVec3::Y, 1.1)),
        )],
        // A batch touching an ancestor/descendant pair and a sibling branch.
        vec![
            ("robot", RigidTransform::from_translation(dvec3(-1.0, 0.0, 0.5))),
            ("arm", RigidTransform::from_translation(dvec3(0.0, 2.0, 0.0))),
            ("beacon", RigidTransform::from_translation(dvec3(9.0, 9.0, 9.0))),
        ],
    ];

    let ids = all_ids(&graph);
    for step in steps {
        graph.set_local_batch(&step).unwrap();
        for (id, local) in &step {
            naive.set_local(id, *local);
        }

        for (from, to) in ids.iter().cartesian_product(ids.iter()) {
            let cached = graph.transform_from_to(from, to).unwrap();
            let recomputed = naive.transform_from_to(from, to);
            assert!(
                cached.abs_diff_eq(&recomputed, EPSILON),
                "cache diverged from naive recomputation for {from} -> {to}"
            );
        }
    }
}

/// Registers a listener on every frame and returns the fired ids, with
/// multiplicity, so tests can assert on the exact stale set.
fn record_fired(graph: &mut TransformGraph) -> Rc<RefCell<Vec<String>>> {
    let fired = Rc::new(RefCell::new(Vec::new()));
    for id in all_ids(graph) {
        let fired = Rc::clone(&fired);
        graph
            .on_change(&id, move |stale| fired.borrow_mut().push(stale.to_string()))
            .unwrap();
    }
    fired
}

#[test]
fn test_single_update_stales_exactly_the_subtree() {
    let mut graph = robot_scene();
    let fired = record_fired(&mut graph);

    graph
        .set_local("arm", RigidTransform::from_translation(dvec3(0.0, 1.0, 0.0)))
        .unwrap();

    let stale = fired.borrow().iter().cloned().sorted().collect_vec();
    assert_eq!(stale, ["arm", "gripper"]);
}

#[test]
fn test_batch_update_stales_the_deduplicated_union() {
    let mut graph = robot_scene();
    let fired = record_fired(&mut graph);

    // "arm" is a descendant of "robot": its subtree must not be traversed
    // twice. "beacon" is an independent branch.
    graph
        .set_local_batch(&[
            ("robot", RigidTransform::IDENTITY),
            ("arm", RigidTransform::IDENTITY),
            ("beacon", RigidTransform::IDENTITY),
        ])
        .unwrap();

    let stale = fired.borrow().iter().cloned().sorted().collect_vec();
    // Every stale frame fires exactly once.
    assert_eq!(stale, ["arm", "beacon", "camera", "gripper", "robot"]);
}

#[test]
fn test_grandparent_chain_translations() {
    let mut graph = TransformGraph::new();
    graph.add("world", None, RigidTransform::IDENTITY).unwrap();
    graph
        .add(
            "robot",
            Some("world"),
            RigidTransform::from_translation(dvec3(1.0, 0.0, 0.0)),
        )
        .unwrap();
    graph
        .add(
            "camera",
            Some("robot"),
            RigidTransform::from_translation(dvec3(0.0, 0.0, 1.0)),
        )
        .unwrap();

    let world_from_camera = graph.transform_from_to("world", "camera").unwrap();
    assert!(
        world_from_camera
            .transform_point(dvec3(0.0, 0.0, 0.0))
            .abs_diff_eq(dvec3(1.0, 0.0, 1.0), EPSILON)
    );
}

#[test]
fn test_sibling_cross_branch() {
    let mut graph = TransformGraph::new();
    graph.add("world", None, RigidTransform::IDENTITY).unwrap();
    graph
        .add(
            "arm",
            Some("world"),
            RigidTransform::from_translation(dvec3(1.0, 0.0, 0.0)),
        )
        .unwrap();
    graph
        .add(
            "leg",
            Some("world"),
            RigidTransform::from_translation(dvec3(0.0, 1.0, 0.0)),
        )
        .unwrap();

    let arm_from_leg = graph.transform_from_to("arm", "leg").unwrap();
    assert!(
        arm_from_leg
            .transform_point(dvec3(0.0, 0.0, 0.0))
            .abs_diff_eq(dvec3(-1.0, 1.0, 0.0), EPSILON)
    );
}

#[test]
fn test_quarter_turn_about_z() {
    let mut graph = TransformGraph::new();
    graph.add("world", None, RigidTransform::IDENTITY).unwrap();
    graph
        .add(
            "rotated",
            Some("world"),
            RigidTransform::from_rotation(DQuat::from_axis_angle(
                DVec3::Z,
                std::f64::consts::FRAC_PI_2,
            )),
        )
        .unwrap();

    let world_from_rotated = graph.transform_from_to("world", "rotated").unwrap();
    assert!(
        world_from_rotated
            .transform_point(dvec3(1.0, 0.0, 0.0))
            .abs_diff_eq(dvec3(0.0, 1.0, 0.0), 1e-5)
    );
}
