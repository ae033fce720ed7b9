//! Structured plans parsed from the plan agent's Markdown answer

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)]\s+(.+)$").expect("step regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold regex"));
static COMPLEXITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?\s*complexity\s*:\s*(low|medium|high)\s*\)?").expect("complexity regex")
});

/// Estimated effort of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Small, local change
    Low,
    /// Several files or moderate risk
    Medium,
    /// Broad or risky change
    High,
    /// Not stated by the model
    Unspecified,
}

impl Complexity {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unspecified,
        }
    }
}

/// One ordered step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Position as written by the model
    pub number: usize,
    /// Step name
    pub title: String,
    /// Estimated complexity
    pub complexity: Complexity,
    /// Everything written under the step
    pub details: String,
}

/// A parsed implementation plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Short description of the approach
    pub overview: String,
    /// Ordered steps
    pub steps: Vec<PlanStep>,
    /// Prerequisites and ordering constraints
    pub dependencies: Vec<String>,
    /// Risks worth checking
    pub risks: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Overview,
    Steps,
    Dependencies,
    Risks,
    Other,
}

impl Section {
    fn from_heading(heading: &str) -> Self {
        let h = heading.to_ascii_lowercase();
        if h.contains("overview") || h.contains("summary") || h.contains("approach") {
            Self::Overview
        } else if h.contains("step") || h.contains("task") {
            Self::Steps
        } else if h.contains("depend") || h.contains("prereq") {
            Self::Dependencies
        } else if h.contains("risk") || h.contains("caveat") {
            Self::Risks
        } else {
            Self::Other
        }
    }
}

/// Parse a plan answer
///
/// Returns `None` when the text contains no numbered steps. Without a
/// steps heading, numbered lines anywhere in the text are taken as steps.
#[must_use]
pub fn parse_plan(text: &str) -> Option<Plan> {
    let has_steps_heading = text
        .lines()
        .filter_map(heading)
        .any(|h| Section::from_heading(h) == Section::Steps);

    let mut plan = Plan::default();
    let mut overview = Vec::new();
    let mut preamble = Vec::new();
    let mut section = Section::Preamble;

    for line in text.lines() {
        if let Some(h) = heading(line) {
            section = Section::from_heading(h);
            continue;
        }

        let in_steps = section == Section::Steps || (!has_steps_heading && section != Section::Other);
        if in_steps {
            if let Some(cap) = STEP_RE.captures(line) {
                let number = cap[1].parse().unwrap_or(plan.steps.len() + 1);
                plan.steps.push(new_step(number, &cap[2]));
                continue;
            }
            if let Some(step) = plan.steps.last_mut() {
                let detail = strip_bullet(line);
                if !detail.is_empty() {
                    if !step.details.is_empty() {
                        step.details.push('\n');
                    }
                    step.details.push_str(detail);
                }
                continue;
            }
        }

        match section {
            Section::Preamble => preamble.push(line.trim()),
            Section::Overview => overview.push(line.trim()),
            Section::Dependencies => push_item(&mut plan.dependencies, line),
            Section::Risks => push_item(&mut plan.risks, line),
            Section::Steps | Section::Other => {}
        }
    }

    if plan.steps.is_empty() {
        return None;
    }
    let overview = if overview.iter().any(|l| !l.is_empty()) {
        overview
    } else {
        preamble
    };
    plan.overview = overview.join("\n").trim().to_string();
    Some(plan)
}

fn heading(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .starts_with('#')
        .then(|| trimmed.trim_start_matches('#').trim())
}

fn strip_bullet(line: &str) -> &str {
    let t = line.trim();
    t.strip_prefix("- ")
        .or_else(|| t.strip_prefix("* "))
        .unwrap_or(t)
        .trim()
}

fn push_item(items: &mut Vec<String>, line: &str) {
    let item = match STEP_RE.captures(line) {
        Some(cap) => cap.get(2).map_or("", |m| m.as_str()).trim().to_string(),
        None => strip_bullet(line).to_string(),
    };
    if !item.is_empty() {
        items.push(item);
    }
}

fn new_step(number: usize, rest: &str) -> PlanStep {
    let complexity = COMPLEXITY_RE
        .captures(rest)
        .map_or(Complexity::Unspecified, |c| Complexity::parse(&c[1]));
    let without_complexity = COMPLEXITY_RE.replace(rest, "");

    let (title, trailing) = match BOLD_RE.captures(&without_complexity) {
        Some(cap) => {
            let whole = cap.get(0).map_or(0..0, |m| m.range());
            (
                cap[1].trim().to_string(),
                without_complexity[whole.end..].to_string(),
            )
        }
        None => (without_complexity.trim().to_string(), String::new()),
    };

    let trailing = trailing
        .trim()
        .trim_start_matches([':', '-'])
        .trim()
        .to_string();
    PlanStep {
        number,
        title: title.trim_end_matches(':').trim().to_string(),
        complexity,
        details: trailing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = "## Overview
Move argument parsing out of main.py into its own module.

## Steps
1. **Extract parser** (Complexity: Low)
   - Create cli/args.py with build_parser()
   - Move the argparse setup there
2. **Update callers** (Complexity: Medium): switch main.py to the new module
3. Add tests

## Dependencies
- Step 2 needs step 1

## Risks
- Scripts importing main.build_parser break
";

    #[test]
    fn test_parses_sections_and_steps() {
        let plan = parse_plan(PLAN).unwrap();

        assert_eq!(plan.overview, "Move argument parsing out of main.py into its own module.");
        assert_eq!(plan.steps.len(), 3);

        let first = &plan.steps[0];
        assert_eq!(first.number, 1);
        assert_eq!(first.title, "Extract parser");
        assert_eq!(first.complexity, Complexity::Low);
        assert_eq!(
            first.details,
            "Create cli/args.py with build_parser()\nMove the argparse setup there"
        );

        let second = &plan.steps[1];
        assert_eq!(second.title, "Update callers");
        assert_eq!(second.complexity, Complexity::Medium);
        assert_eq!(second.details, "switch main.py to the new module");

        assert_eq!(plan.steps[2].title, "Add tests");
        assert_eq!(plan.steps[2].complexity, Complexity::Unspecified);

        assert_eq!(plan.dependencies, vec!["Step 2 needs step 1"]);
        assert_eq!(plan.risks, vec!["Scripts importing main.build_parser break"]);
    }

    #[test]
    fn test_numbered_list_without_headings() {
        let plan = parse_plan("Here is the plan:\n1. Read config (complexity: high)\n2. Write it").unwrap();
        assert_eq!(plan.overview, "Here is the plan:");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].title, "Read config");
        assert_eq!(plan.steps[0].complexity, Complexity::High);
    }

    #[test]
    fn test_prose_is_not_a_plan() {
        assert!(parse_plan("The parser cannot be split without breaking imports.").is_none());
    }
}
