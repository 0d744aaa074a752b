use corflow_core::levels::{corpus, transcription};
use corflow_core::{AnnotationGraph, EntityDraft, EntityId, EntityKind, DIVISION_OMNI, DIVISION_TECH};

fn session(graph: &mut AnnotationGraph) -> EntityId {
    let root = graph.new_root(EntityKind::Corpus, EntityDraft::new("corpus"));
    graph.create(root, None, EntityDraft::new("session")).unwrap()
}

fn tier(graph: &mut AnnotationGraph, trans: EntityId, name: &str) -> EntityId {
    graph.create(trans, None, EntityDraft::new(name)).unwrap()
}

fn seg(graph: &mut AnnotationGraph, tier: EntityId, name: &str, span: Option<(f64, f64)>) -> EntityId {
    let draft = match span {
        Some((start, end)) => EntityDraft::new(name).with_span(start, end),
        None => EntityDraft::new(name),
    };
    graph.create(tier, None, draft).unwrap()
}

fn span(graph: &AnnotationGraph, id: EntityId) -> Option<(f64, f64)> {
    graph.get(id).and_then(|entity| entity.span())
}

#[test]
fn set_bounds_takes_the_union_of_tier_extents() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let a = tier(&mut graph, trans, "a");
    let b = tier(&mut graph, trans, "b");
    let empty = tier(&mut graph, trans, "empty");
    seg(&mut graph, a, "a0", Some((1.0, 2.0)));
    seg(&mut graph, a, "a1", Some((2.0, 4.0)));
    seg(&mut graph, b, "b0", Some((2.0, 6.0)));

    let bounds = transcription::set_bounds(&mut graph, trans, false).unwrap();

    assert_eq!(bounds, (Some(1.0), Some(6.0)));
    for id in [trans, a, b, empty] {
        assert_eq!(span(&graph, id), Some((1.0, 6.0)));
    }
    assert_eq!(
        transcription::set_bounds(&mut graph, trans, false).unwrap(),
        bounds
    );
}

#[test]
fn set_bounds_ignores_negative_starts_unless_allowed() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let a = tier(&mut graph, trans, "a");
    let b = tier(&mut graph, trans, "b");
    seg(&mut graph, a, "a0", Some((-0.5, 2.0)));
    seg(&mut graph, b, "b0", Some((0.5, 3.0)));

    assert_eq!(
        transcription::set_bounds(&mut graph, trans, false).unwrap(),
        (Some(0.5), Some(3.0))
    );
    assert_eq!(
        transcription::set_bounds(&mut graph, trans, true).unwrap(),
        (Some(-0.5), Some(3.0))
    );
}

#[test]
fn set_child_time_stamps_level_by_level() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let top = tier(&mut graph, trans, "top");
    let mid = tier(&mut graph, trans, "mid");
    let low = tier(&mut graph, trans, "low");
    graph.set_parent(mid, Some(top)).unwrap();
    graph.set_parent(low, Some(mid)).unwrap();
    let t0 = seg(&mut graph, top, "t0", Some((0.0, 4.0)));
    let mids: Vec<EntityId> = (0..2).map(|i| seg(&mut graph, mid, &format!("m{i}"), None)).collect();
    let lows: Vec<EntityId> = (0..4).map(|i| seg(&mut graph, low, &format!("l{i}"), None)).collect();
    for m in &mids {
        graph.set_parent(*m, Some(t0)).unwrap();
    }
    for (i, l) in lows.iter().enumerate() {
        graph.set_parent(*l, Some(mids[i / 2])).unwrap();
    }

    transcription::set_child_time(&mut graph, trans, false).unwrap();

    assert_eq!(span(&graph, mids[1]), Some((2.0, 4.0)));
    let low_spans: Vec<Option<(f64, f64)>> = lows.iter().map(|l| span(&graph, *l)).collect();
    assert_eq!(
        low_spans,
        vec![
            Some((0.0, 1.0)),
            Some((1.0, 2.0)),
            Some((2.0, 3.0)),
            Some((3.0, 4.0))
        ]
    );
    assert_eq!(transcription::top_tiers(&graph, trans), vec![top]);
}

#[test]
fn timetable_collects_timed_tier_boundaries() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let untyped = tier(&mut graph, trans, "untyped");
    let subtime = tier(&mut graph, trans, "subtime");
    let reference = tier(&mut graph, trans, "reference");
    graph
        .get_mut(subtime)
        .unwrap()
        .metadata
        .set_meta("type", "subtime", DIVISION_TECH, None);
    graph
        .get_mut(reference)
        .unwrap()
        .metadata
        .set_meta("type", "ref", DIVISION_TECH, None);
    seg(&mut graph, untyped, "u0", Some((0.0, 2.0)));
    seg(&mut graph, untyped, "u1", Some((2.0, 3.0)));
    seg(&mut graph, subtime, "s0", Some((0.5, 2.0)));
    seg(&mut graph, reference, "r0", Some((0.25, 9.0)));

    assert_eq!(
        transcription::timetable(&graph, trans),
        vec![0.0, 0.5, 2.0, 3.0]
    );
}

#[test]
fn copied_transcription_is_independent() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let words = tier(&mut graph, trans, "words");
    let w0 = seg(&mut graph, words, "w0", Some((0.0, 1.0)));
    seg(&mut graph, words, "w1", Some((1.0, 2.0)));
    let root = graph.container(trans).unwrap();

    let copy = graph.add(root, None, trans, None, false).unwrap();
    let copied_words = graph.get_index(copy, 0).unwrap();
    let copied_w0 = graph.get_index(copied_words, 0).unwrap();
    graph.get_mut(copied_w0).unwrap().name = "renamed".to_string();

    assert_eq!(graph.get(w0).unwrap().name, "w0");
    assert_eq!(graph.len(copied_words), 2);
    assert_eq!(graph.elements(root), &[trans, copy]);
}

#[test]
fn copied_transcription_rebuilds_adjacent_parentage() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let top = tier(&mut graph, trans, "top");
    let mid = tier(&mut graph, trans, "mid");
    graph.set_parent(mid, Some(top)).unwrap();
    let t0 = seg(&mut graph, top, "t0", Some((0.0, 2.0)));
    let t1 = seg(&mut graph, top, "t1", Some((2.0, 4.0)));
    let m0 = seg(&mut graph, mid, "m0", Some((0.0, 2.0)));
    let m1 = seg(&mut graph, mid, "m1", Some((2.0, 4.0)));
    graph.set_parent(m0, Some(t0)).unwrap();
    graph.set_parent(m1, Some(t1)).unwrap();

    let copy = graph.duplicate(trans, false).unwrap();

    let copied_top = graph.get_index(copy, 0).unwrap();
    let copied_mid = graph.get_index(copy, 1).unwrap();
    assert_eq!(graph.parent(copied_mid), Some(copied_top));
    let copied_t1 = graph.get_index(copied_top, 1).unwrap();
    let copied_m1 = graph.get_index(copied_mid, 1).unwrap();
    assert_eq!(graph.parent(copied_m1), Some(copied_t1));
    assert_eq!(graph.parent(m1), Some(t1));
    assert_eq!(graph.children(t1, None), vec![m1]);
}

#[test]
fn copied_transcription_drops_non_adjacent_segment_parents() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let top = tier(&mut graph, trans, "top");
    let mid = tier(&mut graph, trans, "mid");
    let low = tier(&mut graph, trans, "low");
    graph.set_parent(mid, Some(top)).unwrap();
    graph.set_parent(low, Some(mid)).unwrap();
    let t0 = seg(&mut graph, top, "t0", Some((0.0, 1.0)));
    let l0 = seg(&mut graph, low, "l0", Some((0.0, 1.0)));
    graph.set_parent(l0, Some(t0)).unwrap();

    let copy = graph.duplicate(trans, false).unwrap();

    let copied_low = graph.get_index(copy, 2).unwrap();
    let copied_l0 = graph.get_index(copied_low, 0).unwrap();
    assert_eq!(graph.parent(copied_low), graph.get_index(copy, 1));
    assert_eq!(graph.parent(copied_l0), None);
    assert_eq!(graph.parent(l0), Some(t0));
}

#[test]
fn speakers_merge_metadata_groups_and_tier_tags() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    {
        let metadata = &mut graph.get_mut(trans).unwrap().metadata;
        metadata.set_meta("spk_1", "name_Alice", DIVISION_OMNI, None);
        metadata.set_meta("spk_1", "age_30", DIVISION_OMNI, None);
    }
    let alice = tier(&mut graph, trans, "alice-words");
    let bob = tier(&mut graph, trans, "bob-words");
    let notes = tier(&mut graph, trans, "notes");
    graph
        .get_mut(alice)
        .unwrap()
        .metadata
        .set_meta("speaker", "Alice", DIVISION_OMNI, None);
    graph
        .get_mut(bob)
        .unwrap()
        .metadata
        .set_meta("speaker", "Bob", DIVISION_OMNI, None);

    let speakers = transcription::speakers(&graph, trans, "spk", DIVISION_OMNI, "speaker");

    let names: Vec<&str> = speakers.iter().map(|spk| spk.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "spk1"]);
    assert_eq!(speakers[0].fields.get("age").map(String::as_str), Some("30"));
    assert_eq!(speakers[0].tiers, vec![alice]);
    assert_eq!(speakers[1].tiers, vec![bob]);
    assert_eq!(speakers[2].tiers, vec![notes]);
}

#[test]
fn speakers_skip_the_default_bucket_when_every_tier_is_tagged() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let only = tier(&mut graph, trans, "only");
    graph
        .get_mut(only)
        .unwrap()
        .metadata
        .set_meta("speaker", "Ana", DIVISION_OMNI, None);

    let speakers = transcription::speakers(&graph, trans, "spk", DIVISION_OMNI, "speaker");

    assert_eq!(speakers.len(), 1);
    assert_eq!(speakers[0].name, "Ana");
}

#[test]
fn transcription_wide_repairs_sum_over_tiers() {
    let mut graph = AnnotationGraph::new();
    let trans = session(&mut graph);
    let a = tier(&mut graph, trans, "a");
    let b = tier(&mut graph, trans, "b");
    seg(&mut graph, a, "x", Some((0.0, 1.5)));
    seg(&mut graph, a, "x", Some((1.0, 2.0)));
    seg(&mut graph, b, "x", Some((0.0, 1.0)));
    seg(&mut graph, b, "x", Some((3.0, 4.0)));

    assert_eq!(transcription::fix_overlaps(&mut graph, trans).unwrap(), 1);
    assert_eq!(transcription::fix_gaps(&mut graph, trans, "_").unwrap(), 1);
    assert_eq!(graph.len(b), 3);
    assert_eq!(transcription::rename_segs(&mut graph, trans, "a").unwrap(), 5);
    let names: Vec<String> = transcription::iter_seg(&graph, trans)
        .map(|id| graph.get(id).unwrap().name.clone())
        .collect();
    assert_eq!(names, vec!["a0", "a1", "a2", "a3", "a4"]);
    assert_eq!(transcription::rem_gaps(&mut graph, trans, "_").unwrap(), 1);
    assert_eq!(graph.len(b), 2);
}

#[test]
fn corpus_iterators_flatten_transcriptions() {
    let mut graph = AnnotationGraph::new();
    let root = graph.new_root(EntityKind::Corpus, EntityDraft::new("corpus"));
    let first = graph.create(root, None, EntityDraft::new("first")).unwrap();
    let second = graph.create(root, None, EntityDraft::new("second")).unwrap();
    let t1 = tier(&mut graph, first, "t1");
    let t2 = tier(&mut graph, second, "t2");
    let t3 = tier(&mut graph, second, "t3");
    let s1 = seg(&mut graph, t1, "s1", None);
    let s3 = seg(&mut graph, t3, "s3", None);

    assert_eq!(corpus::iter_tier(&graph, root).collect::<Vec<_>>(), vec![t1, t2, t3]);
    assert_eq!(corpus::iter_seg(&graph, root).collect::<Vec<_>>(), vec![s1, s3]);

    let copy = graph.duplicate(root, false).unwrap();
    assert_eq!(corpus::iter_seg(&graph, copy).count(), 2);
    assert_eq!(graph.kind(copy), Some(EntityKind::Corpus));
}
