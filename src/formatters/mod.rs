pub mod glue;
pub mod json_report;
pub mod platformio_ini;
pub mod rewrite;
pub mod unit;

pub use glue::GlueFormatter;
pub use json_report::JsonReportFormatter;
pub use platformio_ini::PlatformIoIniFormatter;
pub use rewrite::RewriteList;
pub use unit::{EmittedFile, EmittedUnit, UnitFormatter};

use crate::parsers::{BranchRef, UnitId};

/// Writes lines under reconstructed `#if` chains, reusing an open block when
/// consecutive items share it and switching branches in place when the next
/// item sits in a later branch of the same frame.
pub(crate) struct ConditionalWriter {
    out: String,
    /// (unit, frame, branch) of every block currently open.
    open: Vec<(UnitId, usize, usize)>,
}

impl ConditionalWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            open: Vec::new(),
        }
    }

    pub fn write(&mut self, unit: UnitId, conditions: &[BranchRef], text: &str) {
        let mut keep = 0;
        while keep < self.open.len()
            && keep < conditions.len()
            && self.open[keep] == (unit, conditions[keep].frame, conditions[keep].branch)
        {
            keep += 1;
        }

        let later_branch = keep < self.open.len()
            && keep < conditions.len()
            && self.open[keep].0 == unit
            && self.open[keep].1 == conditions[keep].frame
            && self.open[keep].2 < conditions[keep].branch;

        let retain = if later_branch { keep + 1 } else { keep };
        while self.open.len() > retain {
            self.out.push_str("#endif\n");
            self.open.pop();
        }

        let mut level = keep;
        if later_branch {
            let condition = &conditions[keep];
            let current = self.open[keep].2;
            for directive in &condition.directives[current + 1..=condition.branch] {
                self.line(directive);
            }
            self.open[keep].2 = condition.branch;
            level += 1;
        }

        for condition in &conditions[level..] {
            for directive in &condition.directives {
                self.line(directive);
            }
            self.open.push((unit, condition.frame, condition.branch));
        }

        self.line(text);
    }

    pub fn finish(mut self) -> String {
        while self.open.pop().is_some() {
            self.out.push_str("#endif\n");
        }
        self.out
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }
}
