use chrono::Duration;
use classlog_core::model::group::Group;
use classlog_core::model::student::Student;
use classlog_core::{
    ClassroomService, HistoryEnvelope, HistoryManager, JsonFileStore, MemoryStore,
    NewStudentRequest, RecordingSink,
};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

#[test]
fn stale_counters_are_healed_on_load() {
    let mut envelope = HistoryEnvelope::default();
    for id in ["student_4", "student_12", "guest"] {
        envelope
            .students
            .insert(id.to_string(), Student::new(id, "A", "B", 0.0, 0.0));
    }
    envelope
        .student_groups
        .insert("group_2".to_string(), Group::new("group_2", "Blue", "#A0C4FF"));
    envelope.settings.counters.next_student_id = 5;
    envelope.settings.counters.next_furniture_id = 9;

    let history = HistoryManager::open(
        MemoryStore::seeded(envelope),
        RecordingSink::new(),
        Duration::days(90),
    );
    let counters = history.state().counters;
    assert_eq!(counters.next_student_id, 13);
    assert_eq!(counters.next_furniture_id, 9);
    assert_eq!(counters.next_group_id, 3);
    assert_eq!(history.load_report().healed_counters.len(), 2);
}

#[test]
fn dangling_group_reference_is_detached_on_load() {
    let mut envelope = HistoryEnvelope::default();
    let mut student = Student::new("student_1", "A", "B", 0.0, 0.0);
    student.group_id = Some("group_7".to_string());
    envelope.students.insert(student.id.clone(), student);

    let history = HistoryManager::open(
        MemoryStore::seeded(envelope),
        RecordingSink::new(),
        Duration::days(90),
    );
    assert!(history.state().students["student_1"].group_id.is_none());
    assert_eq!(history.load_report().detached_students, vec!["student_1"]);
}

#[test]
fn counters_never_move_backwards_across_add_and_delete() {
    let mut service = ClassroomService::new(HistoryManager::open(
        MemoryStore::new(),
        RecordingSink::new(),
        Duration::days(90),
    ));
    let first = service.add_student(NewStudentRequest::default()).unwrap();
    let second = service.add_student(NewStudentRequest::default()).unwrap();
    service
        .delete_item(classlog_core::ItemKind::Student, &second)
        .unwrap();
    let third = service.add_student(NewStudentRequest::default()).unwrap();

    assert_eq!(first, "student_1");
    assert_eq!(second, "student_2");
    assert_eq!(third, "student_3");
    assert_eq!(service.state().counters.next_student_id, 4);
}

#[test]
fn damaged_counter_values_do_not_wipe_the_classroom() {
    let student = |id: &str| json!({"id": id, "first_name": "A", "last_name": "B", "x": 0.0, "y": 0.0});
    for damaged in [json!(-1), json!(null), json!("seven"), json!(2.5)] {
        let dir = tempdir().unwrap();
        let path = dir.path().join("classroom.json");
        let envelope = json!({
            "students": {"student_1": student("student_1"), "student_2": student("student_2")},
            "settings": {"next_student_id": damaged, "next_group_id_num": -4}
        });
        fs::write(&path, envelope.to_string()).unwrap();

        let history = HistoryManager::open(
            JsonFileStore::new(&path),
            RecordingSink::new(),
            Duration::days(90),
        );
        let report = history.load_report();
        assert!(report.loaded, "counter {damaged} should not fail the load");
        assert!(!report.corrupt);
        assert_eq!(history.state().students.len(), 2);
        assert_eq!(history.state().counters.next_student_id, 3);
        assert_eq!(history.state().counters.next_group_id, 1);
    }
}
