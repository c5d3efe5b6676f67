//! Prompt templates for the planner agents and the coding worker.

use std::collections::BTreeMap;

use autodev_types::{ReviewRole, Task};
use chrono::Utc;

// ---------------------------------------------------------------------------
// System prompts
// ---------------------------------------------------------------------------

pub const PM_SYSTEM: &str = "You are a senior product manager. You turn raw user \
requirements into precise, complete Product Requirements Documents in markdown. \
Your PRDs contain an overview, user stories, functional requirements, \
non-functional requirements, acceptance criteria, and success metrics.";

pub const REVIEWER_PM_SYSTEM: &str = "You are a product manager reviewing a PRD. \
Evaluate requirement completeness, user value, business logic, and user \
experience. List concrete issues and suggested fixes.";

pub const REVIEWER_DEV_SYSTEM: &str = "You are a senior software engineer reviewing \
a PRD. Evaluate technical feasibility, implementation complexity, technical \
risks, and design soundness. List concrete issues and suggested fixes.";

pub const REVIEWER_QA_SYSTEM: &str = "You are a QA engineer reviewing a PRD. \
Evaluate testability, test coverage implications, quality standards, and defect \
prevention. List concrete issues and suggested fixes.";

pub const ARCHITECT_SYSTEM: &str = "You are a software architect. You turn a PRD \
into a technical design document and an ordered task breakdown. The design \
covers architecture overview, system design, technology stack, data models, \
file structure, and implementation approach.";

pub fn reviewer_system(role: ReviewRole) -> &'static str {
    match role {
        ReviewRole::Pm => REVIEWER_PM_SYSTEM,
        ReviewRole::Dev => REVIEWER_DEV_SYSTEM,
        ReviewRole::Qa => REVIEWER_QA_SYSTEM,
    }
}

// ---------------------------------------------------------------------------
// Prompt builders
// ---------------------------------------------------------------------------

pub fn pm_draft_prompt(requirement: &str, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "Write a complete PRD in markdown for the following requirement.\n\n\
         ## Requirement\n\n{requirement}\n"
    );
    if let Some(fb) = feedback {
        prompt.push_str(&format!(
            "\n## Feedback to Address\n\n{fb}\n\nIncorporate this feedback.\n"
        ));
    }
    prompt.push_str("\nRespond with the PRD content only, no preamble.");
    prompt
}

pub fn reviewer_prompt(role: ReviewRole, prd: &str) -> String {
    format!(
        "Review the following PRD from the {} perspective. Respond with your \
         review in markdown: strengths, issues, and concrete suggestions.\n\n\
         ## PRD\n\n{prd}",
        role.heading()
    )
}

pub fn pm_revision_prompt(
    requirement: &str,
    prd: &str,
    reviews: &BTreeMap<ReviewRole, String>,
    feedback: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Revise the PRD below, addressing every reviewer concern.\n\n\
         ## Original Requirement\n\n{requirement}\n\n\
         ## Current PRD\n\n{prd}\n"
    );
    for (role, review) in reviews {
        prompt.push_str(&format!("\n## {}\n\n{review}\n", role.heading()));
    }
    if let Some(fb) = feedback {
        prompt.push_str(&format!("\n## Human Feedback\n\n{fb}\n"));
    }
    prompt.push_str("\nRespond with the full revised PRD only, no preamble.");
    prompt
}

pub fn architect_prompt(prd: &str, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "Produce a technical design document and a task breakdown for the PRD \
         below.\n\n## PRD\n\n{prd}\n\n\
         ## Output format\n\n\
         First the design document in markdown. Then a single fenced ```json \
         code block containing the task array. Each task object has exactly \
         these keys: \"id\" (task_001 style), \"title\", \"description\", \
         \"dependencies\" (array of task ids), \"status\" (always \"pending\"), \
         and \"priority\" (integer 1-10, higher runs first). Dependencies may \
         only reference earlier declared ids and must not form cycles."
    );
    if let Some(fb) = feedback {
        prompt.push_str(&format!(
            "\n\n## Feedback to Address\n\n{fb}\n\nRevise the design to address this feedback."
        ));
    }
    prompt
}

/// Prompt handed to the coding CLI for one task.
pub fn coder_prompt(prd: &str, design: &str, task: &Task, work_dir: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!("Context:\nWorking in directory: {work_dir}\n\n"));
    if !prd.is_empty() {
        prompt.push_str(&format!("## Product Requirements\n\n{prd}\n\n---\n\n"));
    }
    if !design.is_empty() {
        prompt.push_str(&format!("## Technical Design\n\n{design}\n\n---\n\n"));
    }
    prompt.push_str(&format!(
        "Task:\nTask ID: {}\nTitle: {}\nDescription: {}\n\n\
         Implement this task according to the technical design above.\n\n\
         Constraints:\n\
         - Do not ask for confirmation\n\
         - Create all necessary files\n\
         - Follow the design specification\n\
         - Include error handling\n\
         - Write clean, readable code\n\n\
         Execute directly without asking for confirmation.",
        task.id, task.title, task.description
    ));
    prompt
}

/// The `PRD_Reviews.md` audit record: a generated-at header plus one section
/// per reviewer role.
pub fn format_reviews_file(reviews: &BTreeMap<ReviewRole, String>) -> String {
    let mut out = String::from("# PRD Review Summary\n\n");
    out.push_str(&format!(
        "Reviewed at: {}\n\n---\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    ));
    for (role, review) in reviews {
        out.push_str(&format!("## {}\n\n{review}\n\n---\n\n", role.heading()));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
