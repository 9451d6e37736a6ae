//! End-to-end tests for the scheduling engine: selection ordering, technique
//! allocation and the full New -> Known update flow.

use chrono::{Duration, Utc};

use mnemo::{Engine, FsrsParams, Grade, Storage, Technique};

fn engine_with_topic() -> (Engine, i64) {
    let storage = Storage::in_memory().expect("in-memory storage");
    let topic_id = storage.topics().add("World Capitals").expect("topic");
    (Engine::new(storage), topic_id)
}

#[test]
fn never_graded_concepts_are_selected_first() {
    let (engine, topic_id) = engine_with_topic();
    let concepts = engine.storage().concepts();

    let concept_a = concepts.add(topic_id, "Canberra is the capital of Australia").unwrap();
    let concept_b = concepts.add(topic_id, "Ottawa is the capital of Canada").unwrap();
    let concept_c = concepts.add(topic_id, "Bern is the capital of Switzerland").unwrap();

    // B reviewed long ago with a weak grade, C reviewed yesterday with Easy:
    // retrievability(B) < retrievability(C).
    engine
        .record_recall_and_update_at(
            concept_b,
            "ottawa",
            2,
            Technique::Recall,
            Utc::now() - Duration::days(30),
        )
        .unwrap();
    engine
        .record_recall_and_update_at(
            concept_c,
            "bern",
            4,
            Technique::Recall,
            Utc::now() - Duration::days(1),
        )
        .unwrap();

    // A has no learning state yet, so it wins unconditionally.
    let next = engine.select_next_concept().unwrap().unwrap();
    assert_eq!(next.id, concept_a);

    // Read path is idempotent.
    let again = engine.select_next_concept().unwrap().unwrap();
    assert_eq!(again.id, concept_a);

    // Once A is graded, the policy falls through to minimum retrievability.
    engine
        .record_recall_and_update(concept_a, "canberra", 3, Technique::Recall)
        .unwrap();
    let next = engine.select_next_concept().unwrap().unwrap();
    assert_eq!(next.id, concept_b);
}

#[test]
fn empty_store_selects_nothing() {
    let (engine, _topic_id) = engine_with_topic();
    assert!(engine.select_next_concept().unwrap().is_none());
}

#[test]
fn new_concept_batch_is_reviewed_in_id_order() {
    let (engine, topic_id) = engine_with_topic();
    let concepts = engine.storage().concepts();

    let first = concepts.add(topic_id, "fact one").unwrap();
    let second = concepts.add(topic_id, "fact two").unwrap();
    let third = concepts.add(topic_id, "fact three").unwrap();

    for expected in [first, second, third] {
        let next = engine.select_next_concept().unwrap().unwrap();
        assert_eq!(next.id, expected);
        engine
            .record_recall_and_update(expected, "answer", 4, Technique::Recall)
            .unwrap();
    }
}

#[test]
fn full_new_to_known_flow_grows_stability() {
    let (engine, topic_id) = engine_with_topic();
    let concept_id = engine
        .storage()
        .concepts()
        .add(topic_id, "Paris is the capital of France")
        .unwrap();

    let params = FsrsParams::default();
    let ten_days_ago = Utc::now() - Duration::days(10);

    // First attempt fails: state is created from the initial formulas.
    let first = engine
        .record_recall_and_update_at(concept_id, "no idea", 1, Technique::Recall, ten_days_ago)
        .unwrap();
    assert_eq!(first.stability, params.initial_stability(Grade::Again));
    assert_eq!(first.difficulty, params.initial_difficulty(Grade::Again));
    assert_eq!(first.retrievability, 1.0);

    // Ten days later the concept is recalled successfully.
    let second = engine
        .record_recall_and_update(concept_id, "paris", 3, Technique::Recall)
        .unwrap();

    assert!(second.retrievability < 1.0);
    assert!(
        second.stability > first.stability,
        "stability should grow on successful recall: {} -> {}",
        first.stability,
        second.stability
    );

    // The persisted state matches the reported outcome.
    let state = engine
        .storage()
        .learning_states()
        .get(concept_id)
        .unwrap()
        .unwrap();
    assert_eq!(state.stability, second.stability);
    assert_eq!(state.difficulty, second.difficulty);
}

#[test]
fn lapse_resets_stability_after_growth() {
    let (engine, topic_id) = engine_with_topic();
    let concept_id = engine
        .storage()
        .concepts()
        .add(topic_id, "Rome is the capital of Italy")
        .unwrap();

    let base = Utc::now() - Duration::days(40);
    engine
        .record_recall_and_update_at(concept_id, "rome", 4, Technique::Recall, base)
        .unwrap();
    let grown = engine
        .record_recall_and_update_at(
            concept_id,
            "rome",
            4,
            Technique::Recall,
            base + Duration::days(20),
        )
        .unwrap();

    let lapsed = engine
        .record_recall_and_update(concept_id, "madrid?", 1, Technique::Recall)
        .unwrap();
    assert!(lapsed.stability < grown.stability);
}

#[test]
fn technique_allocation_follows_failure_history() {
    let (engine, topic_id) = engine_with_topic();
    let concepts = engine.storage().concepts();

    let struggling = concepts.add(topic_id, "hard fact").unwrap();
    let steady = concepts.add(topic_id, "easier fact").unwrap();
    let untouched = concepts.add(topic_id, "new fact").unwrap();

    let base = Utc::now() - Duration::days(3);
    for (day, grade) in [(0, 1), (1, 1), (2, 2)] {
        engine
            .record_recall_and_update_at(
                struggling,
                "wrong",
                grade,
                Technique::Recall,
                base + Duration::days(day),
            )
            .unwrap();
    }
    for (day, grade) in [(0, 1), (1, 2), (2, 4)] {
        engine
            .record_recall_and_update_at(
                steady,
                "better",
                grade,
                Technique::Recall,
                base + Duration::days(day),
            )
            .unwrap();
    }

    // Three failures: switch to elaboration. Two failures or none: recall.
    assert_eq!(
        engine.allocate_technique(struggling).unwrap(),
        Technique::Elaboration
    );
    assert_eq!(engine.allocate_technique(steady).unwrap(), Technique::Recall);
    assert_eq!(
        engine.allocate_technique(untouched).unwrap(),
        Technique::Recall
    );
}

#[test]
fn every_attempt_lands_in_the_audit_log() {
    let (engine, topic_id) = engine_with_topic();
    let concept_id = engine
        .storage()
        .concepts()
        .add(topic_id, "Lima is the capital of Peru")
        .unwrap();

    let base = Utc::now() - Duration::days(2);
    engine
        .record_recall_and_update_at(concept_id, "lima", 4, Technique::Recall, base)
        .unwrap();
    engine
        .record_recall_and_update_at(
            concept_id,
            "la paz",
            1,
            Technique::Recall,
            base + Duration::days(1),
        )
        .unwrap();

    let history = engine
        .storage()
        .recall_sessions()
        .history(concept_id)
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].user_response.as_deref(), Some("lima"));
    assert_eq!(history[0].grade, 4);
    assert_eq!(history[1].user_response.as_deref(), Some("la paz"));
    assert_eq!(history[1].grade, 1);
}

#[test]
fn state_survives_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retention.db");

    let concept_id;
    let stability;
    {
        let storage = Storage::new(&path).unwrap();
        let topic_id = storage.topics().add("Persistent").unwrap();
        concept_id = storage.concepts().add(topic_id, "durable fact").unwrap();

        let engine = Engine::new(storage);
        let outcome = engine
            .record_recall_and_update(concept_id, "durable", 3, Technique::Recall)
            .unwrap();
        stability = outcome.stability;
    }

    let storage = Storage::new(&path).unwrap();
    let state = storage.learning_states().get(concept_id).unwrap().unwrap();
    assert_eq!(state.stability, stability);

    let engine = Engine::new(storage);
    assert_eq!(
        engine.allocate_technique(concept_id).unwrap(),
        Technique::Recall
    );
}
