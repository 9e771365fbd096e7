use chrono::Duration;
use classlog_core::{
    ClassroomService, HistoryManager, MemoryStore, NewFurnitureRequest, NewStudentRequest,
    RecordingSink,
};

fn service() -> ClassroomService<MemoryStore, RecordingSink> {
    ClassroomService::new(HistoryManager::open(
        MemoryStore::new(),
        RecordingSink::new(),
        Duration::days(90),
    ))
}

#[test]
fn add_log_undo_branch_and_unwind_restores_counters() {
    let mut service = service();

    let student_id = service
        .add_student(NewStudentRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            x: 50.0,
            y: 50.0,
            ..NewStudentRequest::default()
        })
        .unwrap();
    assert_eq!(student_id, "student_1");
    assert_eq!(service.state().counters.next_student_id, 2);

    service
        .log_behavior(&student_id, "Talking", "during reading")
        .unwrap();
    assert_eq!(service.state().behavior_log.len(), 1);

    assert!(service.undo().unwrap());
    assert!(service.state().behavior_log.is_empty());
    assert_eq!(service.history_manager().redo_len(), 1);

    let desk_id = service
        .add_furniture(NewFurnitureRequest {
            name: "Teacher desk".to_string(),
            furniture_type: "desk".to_string(),
            x: 300.0,
            y: 20.0,
            width: 120.0,
            height: 60.0,
        })
        .unwrap();
    assert_eq!(desk_id, "furniture_1");
    assert_eq!(service.history_manager().redo_len(), 0);
    assert_eq!(service.history_manager().undo_len(), 2);

    assert!(service.undo().unwrap());
    assert!(service.undo().unwrap());
    let state = service.state();
    assert!(state.students.is_empty());
    assert!(state.furniture.is_empty());
    assert_eq!(state.counters.next_student_id, 1);
    assert_eq!(state.counters.next_furniture_id, 1);

    assert!(!service.undo().unwrap());
    assert_eq!(
        service.history_manager().sink().last_status(),
        Some("Nothing to undo.")
    );
}
