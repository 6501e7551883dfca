use super::Options;
use super::coverage::FileCoverage;
use crate::gcov::{GcovFile, GcovFunction};
use core::fmt::{self, Write};
use std::collections::HashSet;

/// Format `numerator / denominator` as a percentage with two decimals.
///
/// A partial result never shows as `0.00` or `100.00`.
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "percentages only need two decimals")]
pub fn format_percent(numerator: u64, denominator: u64) -> String {
    if denominator == 0 {
        return "0.00".to_string();
    }

    let mut percent = numerator as f64 * 100.0 / denominator as f64;
    if numerator > 0 && percent < 0.005 {
        percent = 0.01;
    } else if numerator < denominator && percent >= 99.995 {
        percent = 99.99;
    }

    format!("{percent:.2}")
}

/// Whole-number percentage used on branch and call lines, with the same partial-result rule.
#[must_use]
pub fn branch_percent(numerator: u64, denominator: u64) -> u64 {
    if numerator == 0 || denominator == 0 {
        return 0;
    }
    if numerator >= denominator {
        return 100;
    }

    let rounded = (u128::from(numerator) * 100 + u128::from(denominator) / 2) / u128::from(denominator);
    u64::try_from(rounded).map_or(99, |percent| percent.clamp(1, 99))
}

/// Counts behind a `Lines executed` / `Branches executed` summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub lines: u64,
    pub lines_executed: u64,
    pub branches: u64,
    pub branches_executed: u64,
    pub branches_taken: u64,
    pub calls: u64,
    pub calls_executed: u64,
}

impl Summary {
    #[must_use]
    pub fn for_file(graph: &GcovFile, file: &FileCoverage) -> Self {
        let mut summary = Self::default();

        for (&line, coverage) in &file.lines {
            summary.lines += 1;
            if coverage.count > 0 {
                summary.lines_executed += 1;
            }

            for (function, block) in file.attributed_blocks(graph, line) {
                summary.add_block(function, block);
            }
        }

        summary
    }

    #[must_use]
    pub fn for_function(function: &GcovFunction) -> Self {
        let mut summary = Self::default();
        let mut lines = HashSet::new();
        let mut executed = HashSet::new();

        for (index, block) in function.body_blocks() {
            for &line in &block.lines {
                let _ = lines.insert(line);
                if block.count > 0 {
                    let _ = executed.insert(line);
                }
            }
            summary.add_block(function, index);
        }

        summary.lines = lines.len() as u64;
        summary.lines_executed = executed.len() as u64;
        summary
    }

    fn add_block(&mut self, function: &GcovFunction, block: usize) {
        let ran = function.blocks[block].count > 0;

        if function.is_call_site(block) {
            self.calls += 1;
            self.calls_executed += u64::from(ran);
        }

        let real: Vec<_> = function.real_out_arcs(block).collect();
        if real.len() > 1 {
            let branches = real.len() as u64;
            self.branches += branches;
            if ran {
                self.branches_executed += branches;
            }
            self.branches_taken += real.iter().filter(|arc| arc.count > 0).count() as u64;
        }
    }

    /// Write the summary lines; branch and call lines only with `-b`.
    pub fn write(&self, out: &mut impl Write, options: &Options) -> fmt::Result {
        if self.lines > 0 {
            writeln!(out, "Lines executed:{}% of {}", format_percent(self.lines_executed, self.lines), self.lines)?;
        } else {
            writeln!(out, "No executable lines")?;
        }

        if !options.branch_probabilities {
            return Ok(());
        }

        if self.branches > 0 {
            writeln!(
                out,
                "Branches executed:{}% of {}",
                format_percent(self.branches_executed, self.branches),
                self.branches
            )?;
            writeln!(
                out,
                "Taken at least once:{}% of {}",
                format_percent(self.branches_taken, self.branches),
                self.branches
            )?;
        } else {
            writeln!(out, "No branches")?;
        }

        if self.calls > 0 {
            writeln!(out, "Calls executed:{}% of {}", format_percent(self.calls_executed, self.calls), self.calls)
        } else {
            writeln!(out, "No calls")
        }
    }
}
