use chrono::{Duration, TimeZone, Utc};
use classlog_core::command::{
    AddItem, AppendLogEntry, ChangeItemsSize, ChangeStudentStyle, CompoundCommand, DeleteItem,
    EditItem, ItemPatch, MoveItems, ReassignGroups, ResetSettings,
};
use classlog_core::model::furniture::{FurnitureItem, FurniturePatch};
use classlog_core::model::group::Group;
use classlog_core::model::log_entry::{BehaviorLogEntry, BehaviorLogType};
use classlog_core::model::student::{Student, StudentPatch, StyleValue};
use classlog_core::{
    ClassroomState, Command, CommandAction, CommandError, CommandRegistry, ItemData, ItemKind,
};
use serde_json::json;
use std::collections::BTreeMap;

fn classroom() -> ClassroomState {
    let mut state = ClassroomState::new();
    let mut ada = Student::new("student_1", "Ada", "Lovelace", 10.0, 10.0);
    ada.group_id = Some("group_1".to_string());
    let alan = Student::new("student_2", "Alan", "Turing", 200.0, 10.0);
    let desk = FurnitureItem::new("furniture_1", "Desk", "desk", 400.0, 400.0, 100.0, 50.0);
    state.students.insert(ada.id.clone(), ada);
    state.students.insert(alan.id.clone(), alan);
    state.furniture.insert(desk.id.clone(), desk);
    state
        .groups
        .insert("group_1".to_string(), Group::new("group_1", "Red", "#FFADAD"));
    state.counters.next_student_id = 3;
    state.counters.next_furniture_id = 2;
    state.counters.next_group_id = 2;
    state.settings.grid_size = 40;
    for (minutes, student_id) in [(1, "student_1"), (2, "student_2"), (3, "student_1")] {
        state.behavior_log.push(behavior(student_id, minutes));
    }
    state
}

fn behavior(student_id: &str, minutes: i64) -> BehaviorLogEntry {
    let base = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
    BehaviorLogEntry {
        timestamp: base + Duration::minutes(minutes),
        student_id: student_id.to_string(),
        student_first_name: "First".to_string(),
        student_last_name: "Last".to_string(),
        behavior: "On task".to_string(),
        comment: String::new(),
        log_type: BehaviorLogType::Behavior,
        score_details: None,
    }
}

/// Executes then undoes `action` and checks the state is back where it began.
fn assert_inverse(state: &ClassroomState, action: CommandAction) -> ClassroomState {
    let mut working = state.clone();
    let mut command = Command::new(action);
    command.execute(&mut working).unwrap();
    let applied = working.clone();
    assert_ne!(&applied, state, "{} changed nothing", command.describe());
    command.undo(&mut working).unwrap();
    assert_eq!(&working, state, "{} did not invert", command.describe());
    applied
}

#[test]
fn add_item_is_inverted_including_counter() {
    let state = classroom();
    let student = Student::new("student_3", "Grace", "Hopper", 0.0, 300.0);
    let applied = assert_inverse(
        &state,
        CommandAction::AddItem(AddItem::new(ItemData::Student(student), 3)),
    );
    assert_eq!(applied.counters.next_student_id, 4);
}

#[test]
fn delete_item_is_inverted_with_its_logs() {
    let state = classroom();
    let command = DeleteItem::capture(&state, ItemKind::Student, "student_1").unwrap();
    let applied = assert_inverse(&state, CommandAction::DeleteItem(command));
    assert_eq!(applied.behavior_log.len(), 1);
}

#[test]
fn edit_item_is_inverted_field_by_field() {
    let state = classroom();
    let patch = StudentPatch {
        first_name: Some("Augusta".to_string()),
        nickname: Some(Some("Ada".to_string())),
        group_id: Some(None),
        ..StudentPatch::default()
    };
    let command = EditItem::capture(&state, "student_1", ItemPatch::Student(patch)).unwrap();
    let applied = assert_inverse(&state, CommandAction::EditItem(command));
    assert_eq!(applied.students["student_1"].first_name, "Augusta");
    assert!(applied.students["student_1"].group_id.is_none());

    let patch = FurniturePatch {
        fill_color: Some("brown".to_string()),
        ..FurniturePatch::default()
    };
    let command = EditItem::capture(&state, "furniture_1", ItemPatch::Furniture(patch)).unwrap();
    assert_inverse(&state, CommandAction::EditItem(command));
}

#[test]
fn layout_commands_are_inverted() {
    let state = classroom();
    let moves = MoveItems::capture(
        &state,
        vec![
            (ItemKind::Student, "student_1".to_string(), 50.0, 60.0),
            (ItemKind::Furniture, "furniture_1".to_string(), 0.0, 0.0),
        ],
    );
    assert_inverse(&state, CommandAction::MoveItems(moves));

    let sizes = ChangeItemsSize::capture(
        &state,
        vec![(ItemKind::Student, "student_2".to_string(), 150.0, 90.0)],
    );
    assert_inverse(&state, CommandAction::ChangeItemsSize(sizes));

    let style = ChangeStudentStyle::capture(
        &state,
        "student_2",
        "font_size",
        Some(StyleValue::Number(14.0)),
    )
    .unwrap();
    assert_inverse(&state, CommandAction::ChangeStudentStyle(style));
}

#[test]
fn group_and_settings_commands_are_inverted() {
    let state = classroom();
    let mut groups = state.groups.clone();
    groups.insert("group_2".to_string(), Group::new("group_2", "Blue", "#A0C4FF"));
    let assignments = BTreeMap::from([
        ("student_1".to_string(), "group_2".to_string()),
        ("student_2".to_string(), "group_1".to_string()),
    ]);
    let command = ReassignGroups::capture(&state, groups, assignments, 3);
    let applied = assert_inverse(&state, CommandAction::ReassignGroups(command));
    assert_eq!(applied.counters.next_group_id, 3);

    let applied = assert_inverse(&state, CommandAction::ResetSettings(ResetSettings::new()));
    assert_eq!(applied.settings.grid_size, 20);
    assert_eq!(applied.counters, state.counters);
}

#[test]
fn log_append_is_idempotent_and_inverted() {
    let state = classroom();
    let entry = behavior("student_2", 0);
    let applied = assert_inverse(
        &state,
        CommandAction::AppendLogEntry(AppendLogEntry::behavior(entry.clone())),
    );
    assert_eq!(applied.behavior_log[0], entry);

    let mut working = state.clone();
    let mut command = Command::new(CommandAction::AppendLogEntry(AppendLogEntry::behavior(
        state.behavior_log[0].clone(),
    )));
    command.execute(&mut working).unwrap();
    assert_eq!(working.behavior_log.len(), state.behavior_log.len());
}

#[test]
fn compound_failure_rolls_back_applied_children() {
    let state = classroom();
    let moves = MoveItems::capture(
        &state,
        vec![(ItemKind::Student, "student_1".to_string(), 500.0, 500.0)],
    );
    let missing = DeleteItem {
        item_id: "student_9".to_string(),
        item_type: ItemKind::Student,
        item_data: ItemData::Student(Student::new("student_9", "No", "One", 0.0, 0.0)),
        associated_logs: Vec::new(),
        associated_homework_logs: Vec::new(),
    };
    let mut command = Command::new(CommandAction::Compound(CompoundCommand::new(
        "Broken batch",
        vec![
            Command::new(CommandAction::MoveItems(moves.clone())),
            Command::new(CommandAction::DeleteItem(missing)),
        ],
    )));

    let mut working = state.clone();
    let err = command.execute(&mut working).unwrap_err();
    assert!(matches!(err, CommandError::Compound { index: 1, .. }));
    assert_eq!(working, state);

    let compound = CompoundCommand::new(
        "Move and reset",
        vec![
            Command::new(CommandAction::MoveItems(moves)),
            Command::new(CommandAction::ResetSettings(ResetSettings::new())),
        ],
    );
    assert_inverse(&state, CommandAction::Compound(compound));
}

fn legacy_edit(changes: serde_json::Value) -> serde_json::Value {
    json!({
        "type": "EditItemCommand",
        "timestamp": "2024-04-02T09:15:00",
        "data": {
            "item_id": "student_2",
            "item_type": "student",
            "old_item_data_snapshot": {
                "id": "student_2",
                "first_name": "Alan",
                "last_name": "Turing",
                "nickname": "",
                "full_name": "Alan Turing",
                "gender": "Boy",
                "x": 200.0,
                "y": 10.0,
                "width": 130,
                "height": 80,
                "style_overrides": {},
                "group_id": null
            },
            "new_item_data_changes": changes
        }
    })
}

#[test]
fn legacy_resize_and_rename_edits_are_inverted() {
    let registry = CommandRegistry::new();
    let state = classroom();

    let resize = registry
        .from_value(&legacy_edit(json!({
            "width": 180,
            "height": 95,
            "style_overrides": {"fill_color": "#FFF3B0", "font_size": 12}
        })))
        .unwrap();
    let CommandAction::EditItem(resize) = resize.action else {
        panic!("expected an edit");
    };
    let applied = assert_inverse(&state, CommandAction::EditItem(resize));
    let alan = &applied.students["student_2"];
    assert_eq!(alan.width, 180.0);
    assert_eq!(
        alan.style_overrides["fill_color"],
        StyleValue::Text("#FFF3B0".to_string())
    );

    let rename = registry
        .from_value(&legacy_edit(json!({
            "first_name": "Alonzo",
            "full_name": "Alonzo Turing"
        })))
        .unwrap();
    assert_eq!(rename.describe(), "Edit student: Alan Turing (first_name)");
    let applied = assert_inverse(&state, rename.action);
    assert_eq!(applied.students["student_2"].full_name(), "Alonzo Turing");
}

#[test]
fn legacy_edit_with_unknown_field_is_reported() {
    let registry = CommandRegistry::new();
    let warning = registry
        .from_value(&legacy_edit(json!({"first_name": "Alonzo", "seat_row": 3})))
        .unwrap_err();
    assert_eq!(warning.code(), "malformed_data");
    assert!(warning.to_string().contains("seat_row"));

    let mut state = classroom();
    let bad_style = EditItem::capture(
        &state,
        "student_2",
        ItemPatch::Student(StudentPatch {
            style_overrides: Some(BTreeMap::from([(
                "width".to_string(),
                StyleValue::Number(180.0),
            )])),
            ..StudentPatch::default()
        }),
    )
    .unwrap();
    let before = state.clone();
    let err = Command::new(CommandAction::EditItem(bad_style))
        .execute(&mut state)
        .unwrap_err();
    assert_eq!(err, CommandError::InvalidStyleProperty("width".to_string()));
    assert_eq!(state, before);
}

#[test]
fn reset_settings_without_snapshot_refuses_undo() {
    let registry = CommandRegistry::new();
    let mut state = classroom();
    let mut command = registry
        .from_value(&json!({
            "type": "ResetSettingsCommand",
            "timestamp": "2024-04-02T09:15:00",
            "data": {"old_settings": null, "new_settings": null}
        }))
        .unwrap();
    let before = state.clone();
    let err = command.undo(&mut state).unwrap_err();
    assert_eq!(err.code(), "missing_snapshot");
    assert_eq!(state, before);
}
