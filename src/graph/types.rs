//! Records read from the graph data store and the trigger that starts a run

use serde::{Deserialize, Serialize};

/// Identity of a link (node or edge) in the graph
pub type LinkId = i64;

/// A package as stored in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: LinkId,
    pub name: String,
}

/// The version attached to a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: LinkId,
    pub version: String,
}

/// The newly inserted publish link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    /// The package to publish
    pub from_id: LinkId,
    /// Link whose value is the declared package name
    pub to_id: LinkId,
}

/// Event that invoked the publish run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerContext {
    pub triggered_by_link_id: LinkId,
    pub new_link: NewLink,
}

impl TriggerContext {
    pub fn package_id(&self) -> LinkId {
        self.new_link.from_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_context_from_handler_payload() {
        let json = r#"{
            "triggeredByLinkId": 380,
            "newLink": {"id": 901, "type_id": 55, "from_id": 512, "to_id": 513}
        }"#;

        let trigger: TriggerContext = serde_json::from_str(json).unwrap();
        assert_eq!(trigger.triggered_by_link_id, 380);
        assert_eq!(trigger.new_link.to_id, 513);
        assert_eq!(trigger.package_id(), 512);
    }

    #[test]
    fn test_trigger_context_requires_new_link() {
        let result = serde_json::from_str::<TriggerContext>(r#"{"triggeredByLinkId": 1}"#);
        assert!(result.is_err());
    }
}
