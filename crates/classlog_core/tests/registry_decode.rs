use chrono::{TimeZone, Utc};
use classlog_core::command::{
    AddItem, CompoundCommand, EditItem, ItemPatch, MoveItems, ReassignGroups,
};
use classlog_core::model::student::{Student, StudentPatch};
use classlog_core::{
    ClassroomState, Command, CommandAction, CommandRecord, CommandRegistry,
    DeserializationWarning, ItemData, ItemKind,
};
use serde_json::json;

fn legacy(tag: &str, timestamp: &str, data: serde_json::Value) -> CommandRecord {
    serde_json::from_value(json!({ "type": tag, "timestamp": timestamp, "data": data })).unwrap()
}

#[test]
fn legacy_add_item_reads_embedded_after_add_counter() {
    let registry = CommandRegistry::new();
    let record = legacy(
        "AddItemCommand",
        "2024-02-05T13:45:10.123456",
        json!({
            "item_id": "student_3",
            "item_type": "student",
            "old_next_id_num": 3,
            "item_data": {
                "id": "student_3",
                "first_name": "Grace",
                "last_name": "Hopper",
                "nickname": "",
                "full_name": "Grace Hopper",
                "gender": "Female",
                "x": 50.0,
                "y": 70.0,
                "width": 130,
                "height": 80,
                "original_next_id_num_after_add": 4,
                "group_id": null,
                "style_overrides": {}
            }
        }),
    );

    let mut command = registry.from_record(&record).unwrap();
    assert_eq!(
        command.timestamp,
        Utc.with_ymd_and_hms(2024, 2, 5, 13, 45, 10).unwrap()
            + chrono::Duration::microseconds(123_456)
    );
    assert_eq!(command.describe(), "Add student: Grace Hopper");

    let mut state = ClassroomState::new();
    state.counters.next_student_id = 3;
    command.execute(&mut state).unwrap();
    assert_eq!(state.counters.next_student_id, 4);
    command.undo(&mut state).unwrap();
    assert_eq!(state.counters.next_student_id, 3);
}

#[test]
fn legacy_log_entry_with_extra_fields_decodes() {
    let registry = CommandRegistry::new();
    let record = legacy(
        "LogEntryCommand",
        "2024-02-05T13:50:00",
        json!({
            "student_id": "student_1",
            "log_entry": {
                "timestamp": "2024-02-05T13:50:00",
                "student_id": "student_1",
                "student_first_name": "Ada",
                "student_last_name": "Lovelace",
                "behavior": "Class Quiz",
                "comment": "From Class Quiz session.",
                "type": "quiz",
                "day": "Monday",
                "score_details": {"correct": 3, "total_asked": 4}
            }
        }),
    );
    let command = registry.from_record(&record).unwrap();
    assert_eq!(command.tag(), "LogEntryCommand");
    assert_eq!(command.describe(), "Log Quiz: 'Class Quiz' for Ada");
}

#[test]
fn legacy_homework_entry_accepts_behavior_key() {
    let registry = CommandRegistry::new();
    let record = legacy(
        "LogHomeworkEntryCommand",
        "2024-02-06T08:00:00",
        json!({
            "student_id": "student_2",
            "log_entry": {
                "timestamp": "2024-02-06T08:00:00",
                "student_id": "student_2",
                "student_first_name": "Alan",
                "student_last_name": "Turing",
                "behavior": "Homework Check",
                "comment": "From Live Homework Session (Yes/No mode).",
                "type": "homework_session_y",
                "homework_details": {"Reading": "yes", "Math": "no"}
            }
        }),
    );
    let command = registry.from_record(&record).unwrap();
    assert_eq!(command.describe(), "Log Homework: 'Homework Check' for Alan");
}

#[test]
fn damaged_records_are_reported_individually() {
    let registry = CommandRegistry::new();
    let records: Vec<_> = vec![
        legacy("AddRulerCommand", "2024-01-01T00:00:00", json!({})),
        legacy(
            "ManageStudentGroupCommand",
            "2024-01-01T00:00:00",
            json!({"old_groups_snapshot": {}}),
        ),
        legacy(
            "ResetSettingsCommand",
            "yesterday",
            json!({"old_settings": null, "new_settings": null}),
        ),
        legacy(
            "ResetSettingsCommand",
            "2024-01-01 09:30:00",
            json!({"old_settings": null, "new_settings": null}),
        ),
    ]
    .into_iter()
    .map(CommandRecord::into_value)
    .collect();
    let (commands, warnings) = registry.decode_stack(&records);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].describe(), "Reset All Settings");
    assert!(matches!(
        &warnings[0],
        DeserializationWarning::UnknownTag { tag } if tag == "AddRulerCommand"
    ));
    assert_eq!(warnings[1].code(), "malformed_data");
    assert_eq!(warnings[2].code(), "bad_timestamp");
}

#[test]
fn nested_compound_survives_record_round_trip() {
    let at = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    let mut state = ClassroomState::new();
    let mut student = Student::new("student_1", "Ada", "Lovelace", 0.0, 0.0);
    student.nickname = Some("Countess".to_string());
    state.students.insert(student.id.clone(), student.clone());

    let edit = EditItem::capture(
        &state,
        "student_1",
        ItemPatch::Student(StudentPatch {
            nickname: Some(None),
            x: Some(40.0),
            ..StudentPatch::default()
        }),
    )
    .unwrap();
    let moves = MoveItems::capture(&state, vec![(ItemKind::Student, "student_1".to_string(), 5.0, 5.0)]);
    let groups = ReassignGroups::capture(&state, state.groups.clone(), Default::default(), 1);
    let add = AddItem::new(
        ItemData::Student(Student::new("student_2", "Alan", "Turing", 0.0, 100.0)),
        2,
    );
    let command = Command::with_timestamp(
        CommandAction::Compound(CompoundCommand::new(
            "Batch",
            vec![
                Command::with_timestamp(CommandAction::EditItem(edit), at),
                Command::with_timestamp(CommandAction::MoveItems(moves), at),
                Command::with_timestamp(CommandAction::ReassignGroups(groups), at),
                Command::with_timestamp(CommandAction::AddItem(add), at),
            ],
        )),
        at,
    );

    let record = command.to_record().unwrap();
    assert_eq!(record.tag, "CompoundCommand");
    let text = serde_json::to_string(&record).unwrap();
    let reread: CommandRecord = serde_json::from_str(&text).unwrap();
    let decoded = CommandRegistry::new().from_record(&reread).unwrap();
    assert_eq!(decoded, command);
}

#[test]
fn compound_with_unknown_child_is_rejected_whole() {
    let registry = CommandRegistry::new();
    let record = legacy(
        "CompoundCommand",
        "2024-01-01T00:00:00Z",
        json!({
            "label": "Broken",
            "commands": [
                {"type": "ResetSettingsCommand", "timestamp": "2024-01-01T00:00:00Z", "data": {}},
                {"type": "AddRulerCommand", "timestamp": "2024-01-01T00:00:00Z", "data": {}}
            ]
        }),
    );
    let warning = registry.from_record(&record).unwrap_err();
    assert_eq!(warning.code(), "malformed_data");
    assert!(warning.to_string().contains("child 1"));
}

#[test]
fn non_object_and_mistyped_records_do_not_sink_the_stack() {
    let registry = CommandRegistry::new();
    let reset = json!({"old_settings": null, "new_settings": null});
    let records = vec![
        json!(42),
        json!({"type": "ResetSettingsCommand", "timestamp": 12345, "data": reset.clone()}),
        json!({"type": 7, "timestamp": "2024-01-01T00:00:00", "data": {}}),
        json!({"type": "ResetSettingsCommand", "timestamp": "2024-01-01T00:00:00", "data": reset}),
    ];
    let (commands, warnings) = registry.decode_stack(&records);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].tag(), "ResetSettingsCommand");
    let codes: Vec<_> = warnings.iter().map(DeserializationWarning::code).collect();
    assert_eq!(codes, vec!["malformed_data", "bad_timestamp", "malformed_data"]);
    assert_eq!(warnings[1].tag(), "ResetSettingsCommand");
}

#[test]
fn legacy_guide_records_decode_and_apply() {
    let registry = CommandRegistry::new();
    let guide = json!({"id": "guide_h_4", "type": "h", "world_coord": 96.5, "canvas_item_id": 12});
    let add = legacy(
        "AddGuideCommand",
        "2024-03-01T10:00:00",
        json!({"item_id": "guide_h_4", "item_type": "horizontal", "item_data": guide.clone(), "old_next_id_num": 4}),
    );
    let moved = legacy(
        "MoveGuideCommand",
        "2024-03-01T10:01:00",
        json!({"items_moves": [{"id": "guide_h_4", "old_coord": 96.5, "new_coord": 120.0}]}),
    );
    let delete = legacy(
        "DeleteGuideCommand",
        "2024-03-01T10:02:00",
        json!({"item_id": "guide_h_4", "item_type": "horizontal", "item_data": guide}),
    );

    let mut state = ClassroomState::new();
    let mut commands: Vec<Command> = [add, moved, delete]
        .iter()
        .map(|record| registry.from_record(record).unwrap())
        .collect();
    assert_eq!(commands[0].describe(), "Add horizontal guide at 96.5");
    assert_eq!(commands[1].describe(), "Move 1 guide(s)");
    for command in &mut commands[..2] {
        command.execute(&mut state).unwrap();
    }
    assert_eq!(state.guides["guide_h_4"].world_coord, 120.0);
    assert_eq!(state.counters.next_guide_id, 5);
    assert_eq!(state.guides["guide_h_4"].extra["canvas_item_id"], 12);

    commands[2].execute(&mut state).unwrap();
    assert!(state.guides.is_empty());
    commands[2].undo(&mut state).unwrap();
    assert_eq!(state.guides["guide_h_4"].world_coord, 96.5);
}
