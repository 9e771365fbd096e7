use chrono::Duration;
use classlog_core::model::live::{HomeworkSessionMode, QuizMark};
use classlog_core::model::log_entry::{HomeworkLogType, HomeworkMarks, QuizScore};
use classlog_core::{
    ClassroomService, HistoryError, HistoryManager, MemoryStore, NewStudentRequest,
    RecordingSink,
};
use std::collections::BTreeMap;

type Service = ClassroomService<MemoryStore, RecordingSink>;

fn service_with_students() -> (Service, String, String) {
    let mut service = ClassroomService::new(HistoryManager::open(
        MemoryStore::new(),
        RecordingSink::new(),
        Duration::days(90),
    ));
    let ada = service
        .add_student(NewStudentRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..NewStudentRequest::default()
        })
        .unwrap();
    let alan = service
        .add_student(NewStudentRequest {
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            x: 300.0,
            ..NewStudentRequest::default()
        })
        .unwrap();
    (service, ada, alan)
}

fn yes_no(pairs: &[(&str, &str)]) -> HomeworkMarks {
    HomeworkMarks::YesNo(
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[test]
fn quiz_marks_undo_and_commit_as_one_entry() {
    let (mut service, ada, alan) = service_with_students();
    service.start_live_quiz(Some("Fractions".to_string())).unwrap();
    service.mark_live_quiz(&ada, QuizMark::Correct).unwrap();
    service.mark_live_quiz(&ada, QuizMark::Incorrect).unwrap();
    service.mark_live_quiz(&alan, QuizMark::Correct).unwrap();
    service.undo().unwrap();

    let saves_before_end = service.history_manager().store().save_count();
    assert_eq!(service.end_live_quiz().unwrap(), 1);
    assert_eq!(
        service.history_manager().store().save_count(),
        saves_before_end + 1
    );

    let log = &service.state().behavior_log;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].behavior, "Fractions");
    assert_eq!(
        log[0].score_details,
        Some(QuizScore {
            correct: 1,
            total_asked: 2
        })
    );
    assert_eq!(
        service.history_manager().sink().last_status(),
        Some("Class Quiz 'Fractions' ended. 1 student scores logged.")
    );

    service.undo().unwrap();
    assert!(service.state().behavior_log.is_empty());
}

#[test]
fn discarding_session_keeps_stacks_and_logs_nothing() {
    let (mut service, ada, _) = service_with_students();
    service.start_live_quiz(None).unwrap();
    service.mark_live_quiz(&ada, QuizMark::Correct).unwrap();
    let undo_len = service.history_manager().undo_len();

    assert!(service.discard_live_quiz());
    assert_eq!(service.history_manager().undo_len(), undo_len);
    assert!(service.state().behavior_log.is_empty());

    service.start_live_quiz(None).unwrap();
    service.mark_live_quiz(&ada, QuizMark::Incorrect).unwrap();
    service.undo().unwrap();
    service.undo().unwrap();
    let session = service.state().live_quiz.as_ref().unwrap();
    assert!(session.scores.is_empty());
}

#[test]
fn yes_no_homework_commits_merged_marks() {
    let (mut service, ada, alan) = service_with_students();
    service
        .start_live_homework(None, HomeworkSessionMode::YesNo)
        .unwrap();
    service
        .mark_live_homework(&ada, yes_no(&[("Reading", "yes")]))
        .unwrap();
    service
        .mark_live_homework(&ada, yes_no(&[("Math", "no")]))
        .unwrap();
    service.mark_live_homework(&alan, yes_no(&[])).unwrap();

    assert_eq!(service.end_live_homework().unwrap(), 1);
    let log = &service.state().homework_log;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].homework_type, "Homework Check");
    assert_eq!(log[0].log_type, HomeworkLogType::SessionYesNo);
    assert_eq!(
        log[0].homework_details,
        Some(yes_no(&[("Math", "no"), ("Reading", "yes")]))
    );
}

#[test]
fn ending_without_session_is_an_error() {
    let (mut service, ada, _) = service_with_students();
    assert!(matches!(
        service.end_live_quiz(),
        Err(HistoryError::NoLiveSession("quiz"))
    ));
    assert!(matches!(
        service.mark_live_homework(&ada, yes_no(&[("Reading", "yes")])),
        Err(HistoryError::NoLiveSession("homework"))
    ));
}

#[test]
fn select_mode_logs_with_select_type() {
    let (mut service, ada, _) = service_with_students();
    service
        .start_live_homework(Some("Worksheet".to_string()), HomeworkSessionMode::Select)
        .unwrap();
    service
        .mark_live_homework(
            &ada,
            HomeworkMarks::Select {
                selected_options: vec!["Complete".to_string()],
            },
        )
        .unwrap();
    service.end_live_homework().unwrap();
    assert_eq!(
        service.state().homework_log[0].log_type,
        HomeworkLogType::SessionSelect
    );
}
