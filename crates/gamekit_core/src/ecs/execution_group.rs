// execution_group.rs - Lanes that component systems are scheduled into

use serde::{Deserialize, Serialize};
use std::fmt;

/// An execution lane. All systems in one group run on the same thread, in
/// registration order. Different groups may run on different threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionGroup {
    /// Only runs when explicitly invoked.
    Manual,
    Render,
    Physics,
    Update,
    Input,
    Io,
}

impl ExecutionGroup {
    pub const COUNT: usize = 6;

    pub const ALL: [ExecutionGroup; Self::COUNT] = [
        ExecutionGroup::Manual,
        ExecutionGroup::Render,
        ExecutionGroup::Physics,
        ExecutionGroup::Update,
        ExecutionGroup::Input,
        ExecutionGroup::Io,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Timed groups pass the wall-clock delta since their previous run to
    /// every system update.
    pub const fn is_timed(self) -> bool {
        matches!(
            self,
            ExecutionGroup::Render | ExecutionGroup::Physics | ExecutionGroup::Update
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            ExecutionGroup::Manual => "manual",
            ExecutionGroup::Render => "render",
            ExecutionGroup::Physics => "physics",
            ExecutionGroup::Update => "update",
            ExecutionGroup::Input => "input",
            ExecutionGroup::Io => "io",
        }
    }
}

impl fmt::Display for ExecutionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_follow_declaration_order() {
        for (index, group) in ExecutionGroup::ALL.iter().enumerate() {
            assert_eq!(group.index(), index);
        }
    }

    #[test]
    fn only_render_physics_update_are_timed() {
        let timed: Vec<_> = ExecutionGroup::ALL
            .into_iter()
            .filter(|group| group.is_timed())
            .collect();
        assert_eq!(
            timed,
            vec![
                ExecutionGroup::Render,
                ExecutionGroup::Physics,
                ExecutionGroup::Update
            ]
        );
    }
}
