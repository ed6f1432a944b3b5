// Parent/child assignment from indentation width.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentStackEntry {
    pub task_id: String,
    pub indent_level: usize,
    pub actual_spaces: usize,
}

/// Recently seen tasks, strictly increasing in `actual_spaces` from bottom to top.
#[derive(Debug)]
pub struct IndentStack {
    entries: Vec<IndentStackEntry>,
    max_operations: usize,
    max_size: usize,
}

impl IndentStack {
    pub fn new(max_operations: usize, max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_operations,
            max_size: max_size.max(1),
        }
    }

    /// Parent id and indent level for a task starting at `actual_spaces`.
    /// The parent is the nearest entry that is strictly shallower.
    pub fn find_parent(&self, actual_spaces: usize) -> (Option<String>, usize) {
        if actual_spaces == 0 {
            return (None, 0);
        }
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.actual_spaces < actual_spaces)
            .map(|entry| (Some(entry.task_id.clone()), entry.indent_level + 1))
            .unwrap_or((None, 0))
    }

    /// Drop every entry at the same depth or deeper, then push the task.
    pub fn push(&mut self, task_id: String, indent_level: usize, actual_spaces: usize) {
        let mut operations = 0;
        while let Some(top) = self.entries.last() {
            operations += 1;
            if operations > self.max_operations {
                log::warn!("Maximum indent stack operations reached, clearing stack");
                self.entries.clear();
                break;
            }
            if top.actual_spaces >= actual_spaces {
                self.entries.pop();
            } else {
                break;
            }
        }

        if self.entries.len() >= self.max_size {
            let excess = self.entries.len() + 1 - self.max_size;
            self.entries.drain(..excess);
        }

        self.entries.push(IndentStackEntry {
            task_id,
            indent_level,
            actual_spaces,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndentStackEntry] {
        &self.entries
    }
}
