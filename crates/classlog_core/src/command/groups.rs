//! Whole-table group replacement.

use crate::command::{CommandError, CommandResult, Reversible};
use crate::model::classroom::ClassroomState;
use crate::model::group::Group;
use crate::model::ids::IdKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replaces the group table, every student's group and the group counter.
///
/// Students absent from an assignment map end up with no group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReassignGroups {
    pub old_groups_snapshot: BTreeMap<String, Group>,
    pub new_groups_snapshot: BTreeMap<String, Group>,
    pub old_student_group_assignments: BTreeMap<String, String>,
    pub new_student_group_assignments: BTreeMap<String, String>,
    pub old_next_group_id_num: u64,
    pub new_next_group_id_num: u64,
}

impl ReassignGroups {
    /// Captures the current table and pairs it with the requested one.
    pub fn capture(
        state: &ClassroomState,
        new_groups: BTreeMap<String, Group>,
        new_assignments: BTreeMap<String, String>,
        new_next_group_id: u64,
    ) -> Self {
        Self {
            old_groups_snapshot: state.groups.clone(),
            new_groups_snapshot: new_groups,
            old_student_group_assignments: state.group_assignments(),
            new_student_group_assignments: new_assignments,
            old_next_group_id_num: state.counters.get(IdKind::Group),
            new_next_group_id_num: new_next_group_id,
        }
    }

    fn replace(
        state: &mut ClassroomState,
        groups: &BTreeMap<String, Group>,
        assignments: &BTreeMap<String, String>,
        next_group_id: u64,
    ) -> CommandResult<()> {
        if let Some(missing) = assignments
            .values()
            .find(|group_id| !groups.contains_key(group_id.as_str()))
        {
            return Err(CommandError::GroupNotFound(missing.clone()));
        }
        state.groups = groups.clone();
        for student in state.students.values_mut() {
            student.group_id = assignments.get(&student.id).cloned();
        }
        state.counters.set(IdKind::Group, next_group_id);
        Ok(())
    }
}

impl Reversible for ReassignGroups {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        Self::replace(
            state,
            &self.new_groups_snapshot,
            &self.new_student_group_assignments,
            self.new_next_group_id_num,
        )
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        Self::replace(
            state,
            &self.old_groups_snapshot,
            &self.old_student_group_assignments,
            self.old_next_group_id_num,
        )
    }

    fn describe(&self) -> String {
        "Manage Student Groups".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::ReassignGroups;
    use crate::command::{CommandError, Reversible};
    use crate::model::classroom::ClassroomState;
    use crate::model::group::Group;
    use crate::model::student::Student;
    use std::collections::BTreeMap;

    #[test]
    fn replace_and_restore_group_table() {
        let mut state = ClassroomState::new();
        for n in 1..=2 {
            let student = Student::new(format!("student_{n}"), "S", "T", 0.0, 0.0);
            state.students.insert(student.id.clone(), student);
        }
        let before = state.clone();

        let groups = BTreeMap::from([(
            "group_1".to_string(),
            Group::new("group_1", "Reds", "#FFADAD"),
        )]);
        let assignments = BTreeMap::from([("student_2".to_string(), "group_1".to_string())]);
        let mut command = ReassignGroups::capture(&state, groups, assignments, 2);

        command.execute(&mut state).expect("reassign");
        assert_eq!(state.students["student_2"].group_id.as_deref(), Some("group_1"));
        assert_eq!(state.counters.next_group_id, 2);

        command.undo(&mut state).expect("undo reassign");
        assert_eq!(state, before);
    }

    #[test]
    fn assignment_to_missing_group_is_rejected() {
        let mut state = ClassroomState::new();
        let assignments = BTreeMap::from([("student_1".to_string(), "group_5".to_string())]);
        let mut command = ReassignGroups::capture(&state, BTreeMap::new(), assignments, 1);
        assert_eq!(
            command.execute(&mut state),
            Err(CommandError::GroupNotFound("group_5".to_string()))
        );
        assert!(state.groups.is_empty());
    }
}
