//! 题目容器的处理状态
//!
//! 状态不挂在页面元素上，而是由处理器单独持有

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::question::ContainerId;

/// 三态标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessingState {
    #[default]
    Untouched,
    InProgress,
    Done,
}

/// 容器 → 处理状态
#[derive(Debug, Default)]
pub struct ProcessingRecords {
    states: Mutex<HashMap<ContainerId, ProcessingState>>,
}

impl ProcessingRecords {
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> MutexGuard<'_, HashMap<ContainerId, ProcessingState>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self, container: &ContainerId) -> ProcessingState {
        self.states().get(container).copied().unwrap_or_default()
    }

    /// untouched → in-progress
    ///
    /// 检查和标记在同一次加锁内完成；失败时返回当前状态
    pub fn try_begin(&self, container: &ContainerId) -> Result<(), ProcessingState> {
        let mut states = self.states();
        match states.get(container).copied().unwrap_or_default() {
            ProcessingState::Untouched => {
                states.insert(container.clone(), ProcessingState::InProgress);
                Ok(())
            }
            other => Err(other),
        }
    }

    pub fn mark_done(&self, container: &ContainerId) {
        self.states().insert(container.clone(), ProcessingState::Done);
    }

    /// 回到 untouched，允许之后重新检测
    pub fn reset(&self, container: &ContainerId) {
        self.states().remove(container);
    }

    pub fn count(&self, state: ProcessingState) -> usize {
        self.states().values().filter(|s| **s == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_one_begin_wins() {
        let records = ProcessingRecords::new();
        let id = ContainerId::new("q1");

        assert_eq!(records.state(&id), ProcessingState::Untouched);
        assert_eq!(records.try_begin(&id), Ok(()));
        assert_eq!(records.try_begin(&id), Err(ProcessingState::InProgress));

        records.mark_done(&id);
        assert_eq!(records.try_begin(&id), Err(ProcessingState::Done));
        assert_eq!(records.count(ProcessingState::Done), 1);
    }

    #[test]
    fn test_reset_allows_new_attempt() {
        let records = ProcessingRecords::new();
        let id = ContainerId::new("q1");

        records.try_begin(&id).unwrap();
        records.reset(&id);
        assert_eq!(records.state(&id), ProcessingState::Untouched);
        assert_eq!(records.try_begin(&id), Ok(()));
    }
}
