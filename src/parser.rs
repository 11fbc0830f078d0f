//! Org-structure markup.
//!
//! ```text
//! root: Acme
//! # comments start with a hash
//! - circle: Product
//!   purpose: Ship the product
//! -- role: Product Owner
//! -- circle: Design
//! --- role: Designer
//! ```
//!
//! The number of leading dashes is the depth below the root. Problems are
//! collected per line instead of stopping at the first one.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::ir::{CircleRecord, RoleRecord, RoleStatus};

static ROOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^root:\s*(.*)$").unwrap());
static PURPOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-*\s*purpose:\s*(.*)$").unwrap());
static DASHES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*(-+)").unwrap());
static DECL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-+\s*(circle|role)\s*:\s*(.*)$").unwrap());
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

const DEFAULT_ROOT_NAME: &str = "Root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsedKind {
    Circle,
    Role,
}

impl fmt::Display for ParsedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Circle => f.write_str("circle"),
            Self::Role => f.write_str("role"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedNode {
    pub kind: ParsedKind,
    pub name: String,
    pub purpose: Option<String>,
    /// Leading dash count; the root has depth 0.
    pub depth: usize,
    /// 1-based source line; 0 for an undeclared root.
    pub line: usize,
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    Syntax,
    Validation,
    BusinessRule,
    Duplicate,
    CoreRole,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    pub line: usize,
    pub message: String,
    pub kind: IssueKind,
}

impl ParseIssue {
    fn new(line: usize, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Error)]
pub enum OrgParseError {
    #[error("org structure has {count} error(s); first: {first}")]
    Invalid { count: usize, first: ParseIssue },
}

/// Parsed markup. `nodes[0]` is the root circle; every other node points at
/// its parent.
#[derive(Debug, Clone, Default)]
pub struct OrgParseOutput {
    pub nodes: Vec<ParsedNode>,
    pub errors: Vec<ParseIssue>,
    pub warnings: Vec<ParseIssue>,
}

impl OrgParseOutput {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.nodes.is_empty()
    }

    pub fn children(&self, index: usize) -> impl Iterator<Item = (usize, &ParsedNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.parent == Some(index))
    }

    /// Converts the parsed tree into engine input. Ids are slugs of the
    /// names, made unique with a numeric suffix.
    pub fn into_records(self) -> Result<Vec<CircleRecord>, OrgParseError> {
        if let Some(first) = self.errors.first() {
            return Err(OrgParseError::Invalid {
                count: self.errors.len(),
                first: first.clone(),
            });
        }

        let mut taken: HashSet<String> = HashSet::new();
        let mut ids: Vec<String> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let prefix = match node.kind {
                ParsedKind::Circle => "",
                ParsedKind::Role => "role-",
            };
            ids.push(unique_id(&format!("{prefix}{}", slug(&node.name)), &mut taken));
        }

        let mut records = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            if node.kind != ParsedKind::Circle {
                continue;
            }
            let roles: Vec<RoleRecord> = self
                .children(index)
                .filter(|(_, child)| child.kind == ParsedKind::Role)
                .map(|(child_index, child)| RoleRecord {
                    id: ids[child_index].clone(),
                    name: child.name.clone(),
                    status: RoleStatus::Active,
                })
                .collect();
            records.push(CircleRecord {
                id: ids[index].clone(),
                parent_id: node.parent.map(|parent| ids[parent].clone()),
                name: node.name.clone(),
                member_count: 0,
                role_count: roles.len() as u32,
                roles,
            });
        }
        Ok(records)
    }
}

pub fn parse_org_structure(text: &str) -> OrgParseOutput {
    parse_org_structure_with_core_roles(text, &[])
}

/// Like [`parse_org_structure`], warning about roles named like one of
/// `core_roles`, which the workspace creates in every circle on its own.
pub fn parse_org_structure_with_core_roles(text: &str, core_roles: &[&str]) -> OrgParseOutput {
    let mut output = OrgParseOutput::default();
    if text.trim().is_empty() {
        output
            .errors
            .push(ParseIssue::new(1, IssueKind::Validation, "Input is empty"));
        return output;
    }

    let core: HashSet<String> = core_roles
        .iter()
        .map(|name| name.trim().to_lowercase())
        .collect();

    output.nodes.push(ParsedNode {
        kind: ParsedKind::Circle,
        name: DEFAULT_ROOT_NAME.to_string(),
        purpose: None,
        depth: 0,
        line: 0,
        parent: None,
    });
    let mut stack: Vec<usize> = vec![0];
    let mut root_named = false;
    let mut last_added: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(caps) = ROOT_RE.captures(trimmed) {
            let name = caps[1].trim();
            if root_named {
                output.errors.push(ParseIssue::new(
                    line_no,
                    IssueKind::Syntax,
                    "Root circle can only be declared once",
                ));
            } else if name.is_empty() {
                output.errors.push(ParseIssue::new(
                    line_no,
                    IssueKind::Syntax,
                    "Root circle name cannot be empty",
                ));
            } else {
                output.nodes[0].name = name.to_string();
                output.nodes[0].line = line_no;
                root_named = true;
                last_added = Some(0);
            }
            continue;
        }

        if let Some(caps) = PURPOSE_RE.captures(trimmed) {
            let purpose = caps[1].trim();
            match last_added {
                Some(target) => {
                    if !purpose.is_empty() {
                        let node = &mut output.nodes[target];
                        if node.purpose.is_some() {
                            output.warnings.push(ParseIssue::new(
                                line_no,
                                IssueKind::General,
                                format!("Purpose already set for {}, overwriting", node.name),
                            ));
                        }
                        node.purpose = Some(purpose.to_string());
                    }
                }
                None => output.errors.push(ParseIssue::new(
                    line_no,
                    IssueKind::Syntax,
                    "Purpose line must follow a circle or role declaration",
                )),
            }
            continue;
        }

        let Some(depth) = DASHES_RE.captures(line).map(|caps| caps[1].len()) else {
            output.errors.push(ParseIssue::new(
                line_no,
                IssueKind::Syntax,
                r#"Invalid line format. Expected "circle:", "role:", or "purpose:""#,
            ));
            continue;
        };

        let Some(caps) = DECL_RE.captures(trimmed) else {
            output.errors.push(ParseIssue::new(
                line_no,
                IssueKind::Syntax,
                r#"Invalid line format. Expected "circle:" or "role:" after dashes"#,
            ));
            continue;
        };
        let kind = if &caps[1] == "circle" {
            ParsedKind::Circle
        } else {
            ParsedKind::Role
        };
        let name = caps[2].trim();
        if name.is_empty() {
            let label = if kind == ParsedKind::Circle { "Circle" } else { "Role" };
            output.errors.push(ParseIssue::new(
                line_no,
                IssueKind::Syntax,
                format!("{label} name cannot be empty"),
            ));
            continue;
        }

        if let Some(previous) = last_added.map(|index| &output.nodes[index])
            && previous.kind == ParsedKind::Role
            && depth > previous.depth
        {
            output.errors.push(ParseIssue::new(
                line_no,
                IssueKind::BusinessRule,
                format!(
                    "Role \"{}\" cannot have children. Roles must be leaf nodes.",
                    previous.name
                ),
            ));
            continue;
        }

        if depth > stack.len() {
            output.errors.push(ParseIssue::new(
                line_no,
                IssueKind::Syntax,
                format!(
                    "Invalid indentation: depth {depth} exceeds parent depth {}. Cannot skip levels.",
                    stack.len() - 1
                ),
            ));
            continue;
        }

        while let Some(&top) = stack.last()
            && output.nodes[top].depth >= depth
        {
            stack.pop();
        }
        let Some(&parent) = stack.last() else {
            output.errors.push(ParseIssue::new(
                line_no,
                IssueKind::Validation,
                "No valid parent found for this node",
            ));
            continue;
        };

        let duplicate = output
            .children(parent)
            .any(|(_, sibling)| sibling.kind == kind && sibling.name == name);
        if duplicate {
            output.warnings.push(ParseIssue::new(
                line_no,
                IssueKind::Duplicate,
                format!(
                    "Duplicate {kind} name \"{name}\" in same parent. This is allowed but may cause confusion."
                ),
            ));
        }

        if kind == ParsedKind::Role {
            let normalized = name.to_lowercase();
            if core.contains(&normalized) {
                output.warnings.push(ParseIssue::new(
                    line_no,
                    IssueKind::CoreRole,
                    format!(
                        "\"{name}\" is a core role that will be automatically created for every circle. Remove this line to avoid duplicates."
                    ),
                ));
            } else if core.is_empty() && normalized.contains("lead") {
                output.warnings.push(ParseIssue::new(
                    line_no,
                    IssueKind::General,
                    format!(
                        "Role \"{name}\" may conflict with auto-created Circle Lead role. Circle Lead roles are automatically created by the system."
                    ),
                ));
            }
        }

        let index = output.nodes.len();
        output.nodes.push(ParsedNode {
            kind,
            name: name.to_string(),
            purpose: None,
            depth,
            line: line_no,
            parent: Some(parent),
        });
        last_added = Some(index);
        if kind == ParsedKind::Circle {
            stack.push(index);
        }
    }

    if !output.errors.is_empty() {
        output.nodes.clear();
    }
    output
}

fn slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = SLUG_RE.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "circle".to_string()
    } else {
        slug.to_string()
    }
}

fn unique_id(base: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut suffix = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
