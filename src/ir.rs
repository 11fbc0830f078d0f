use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    Draft,
    #[default]
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: RoleStatus,
}

/// One circle as delivered by the data layer. Records arrive flat; the
/// hierarchy is reconstructed from `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub role_count: u32,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
}

impl CircleRecord {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            parent_id: None,
            name: name.to_string(),
            member_count: 0,
            role_count: 0,
            roles: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    pub fn with_members(mut self, member_count: u32) -> Self {
        self.member_count = member_count;
        self
    }

    /// Appends a role and keeps `role_count` in step with the role list.
    pub fn with_role(mut self, id: &str, name: &str) -> Self {
        self.roles.push(RoleRecord {
            id: id.to_string(),
            name: name.to_string(),
            status: RoleStatus::Active,
        });
        self.role_count = self.roles.len() as u32;
        self
    }
}

/// Reads a record list from JSON, accepting either a bare array or an object
/// with a `circles` field.
pub fn records_from_json(input: &str) -> serde_json::Result<Vec<CircleRecord>> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    records_from_value(value)
}

pub fn records_from_json5(input: &str) -> anyhow::Result<Vec<CircleRecord>> {
    let value: serde_json::Value = json5::from_str(input)?;
    Ok(records_from_value(value)?)
}

fn records_from_value(value: serde_json::Value) -> serde_json::Result<Vec<CircleRecord>> {
    match value {
        serde_json::Value::Object(mut map) if map.contains_key("circles") => {
            let circles = map.remove("circles").unwrap_or(serde_json::Value::Null);
            serde_json::from_value(circles)
        }
        other => serde_json::from_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_records_with_defaults() {
        let input = r#"[
            {"id": "a", "name": "Alpha", "memberCount": 4},
            {"id": "b", "parentId": "a", "name": "Beta",
             "roles": [{"id": "r1", "name": "Lead", "status": "draft"}]}
        ]"#;
        let records = records_from_json(input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].member_count, 4);
        assert_eq!(records[0].parent_id, None);
        assert_eq!(records[1].parent_id.as_deref(), Some("a"));
        assert_eq!(records[1].roles[0].status, RoleStatus::Draft);
        assert_eq!(records[1].role_count, 0);
    }

    #[test]
    fn accepts_wrapped_circle_list() {
        let input = r#"{"circles": [{"id": "a", "name": "Alpha"}]}"#;
        let records = records_from_json(input).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn json5_allows_comments_and_trailing_commas() {
        let input = "[ // org\n {id: 'a', name: 'Alpha',}, ]";
        let records = records_from_json5(input).unwrap();
        assert_eq!(records[0].id, "a");
    }
}
