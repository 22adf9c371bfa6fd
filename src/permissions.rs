//! Access predicates over a dataset's permission block.
//!
//! Every predicate is pure. The registry calls [`authorize`] before touching
//! an existing dataset and surfaces a failed check as `Unauthorized`.

use std::fmt;

use crate::catalog::Dataset;
use crate::error::RegistryError;

/// Identity of the user or application issuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    Anonymous,
    Principal(String),
}

impl Actor {
    pub fn principal(id: impl Into<String>) -> Self {
        Actor::Principal(id.into())
    }

    /// Blank identifiers are treated as anonymous.
    pub fn from_optional(id: Option<&str>) -> Self {
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => Actor::Principal(id.to_string()),
            _ => Actor::Anonymous,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Actor::Anonymous => None,
            Actor::Principal(id) => Some(id),
        }
    }

    fn is_in(&self, members: &[String]) -> bool {
        self.id()
            .map(|id| members.iter().any(|m| m == id))
            .unwrap_or(false)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Anonymous => write!(f, "anonymous"),
            Actor::Principal(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Delete,
    ManagePermissions,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::Delete => "delete",
            Access::ManagePermissions => "manage permissions of",
        }
    }

    pub fn permits(self, dataset: &Dataset, actor: &Actor) -> bool {
        match self {
            Access::Read => can_read(dataset, actor),
            Access::Write => can_write(dataset, actor),
            Access::Delete => can_delete(dataset, actor),
            Access::ManagePermissions => can_manage_permissions(dataset, actor),
        }
    }
}

pub fn can_read(dataset: &Dataset, actor: &Actor) -> bool {
    let p = &dataset.permissions;
    p.public_read || actor.is_in(&p.owners) || actor.is_in(&p.editors) || actor.is_in(&p.viewers)
}

pub fn can_write(dataset: &Dataset, actor: &Actor) -> bool {
    let p = &dataset.permissions;
    actor.is_in(&p.owners) || actor.is_in(&p.editors)
}

pub fn can_delete(dataset: &Dataset, actor: &Actor) -> bool {
    actor.is_in(&dataset.permissions.owners)
}

pub fn can_manage_permissions(dataset: &Dataset, actor: &Actor) -> bool {
    actor.is_in(&dataset.permissions.owners)
}

pub fn authorize(dataset: &Dataset, actor: &Actor, access: Access) -> Result<(), RegistryError> {
    if access.permits(dataset, actor) {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized {
            message: format!(
                "{} may not {} dataset {}",
                actor,
                access.as_str(),
                dataset.id
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DatasetMetadata, Integration, Permissions};
    use crate::dataset_schema::{FieldDescriptor, FieldKind, Schema};
    use chrono::Utc;

    fn dataset(permissions: Permissions) -> Dataset {
        let now = Utc::now();
        Dataset {
            id: "ds_test".into(),
            name: "Volunteers".into(),
            description: String::new(),
            source_application: "signup-form".into(),
            organization_id: "org-1".into(),
            created_by: "owner".into(),
            created_at: now,
            updated_at: now,
            schema: Schema {
                fields: vec![FieldDescriptor::new("email", FieldKind::Text)],
                version: "1.0.0".into(),
                primary_key: None,
            },
            metadata: DatasetMetadata::default(),
            permissions,
            integration: Integration::default(),
            display_settings: Default::default(),
        }
    }

    fn shared() -> Dataset {
        dataset(Permissions {
            owners: vec!["owner".into()],
            editors: vec!["editor".into()],
            viewers: vec!["viewer".into()],
            public_read: false,
        })
    }

    #[test]
    fn role_matrix() {
        let ds = shared();
        let owner = Actor::principal("owner");
        let editor = Actor::principal("editor");
        let viewer = Actor::principal("viewer");
        let stranger = Actor::principal("stranger");

        assert!(can_read(&ds, &owner) && can_write(&ds, &owner) && can_delete(&ds, &owner));
        assert!(can_manage_permissions(&ds, &owner));

        assert!(can_read(&ds, &editor) && can_write(&ds, &editor));
        assert!(!can_delete(&ds, &editor) && !can_manage_permissions(&ds, &editor));

        assert!(can_read(&ds, &viewer));
        assert!(!can_write(&ds, &viewer) && !can_delete(&ds, &viewer));

        assert!(!can_read(&ds, &stranger) && !can_read(&ds, &Actor::Anonymous));
    }

    #[test]
    fn public_read_opens_reads_only() {
        let mut ds = shared();
        ds.permissions.public_read = true;

        assert!(can_read(&ds, &Actor::Anonymous));
        assert!(can_read(&ds, &Actor::principal("stranger")));
        assert!(!can_write(&ds, &Actor::Anonymous));
    }

    #[test]
    fn authorize_names_actor_and_dataset() {
        let err = authorize(&shared(), &Actor::principal("viewer"), Access::Delete).unwrap_err();
        let message = err.to_string();

        assert_eq!(err.kind(), "unauthorized");
        assert!(message.contains("viewer"));
        assert!(message.contains("ds_test"));
    }

    #[test]
    fn blank_identity_is_anonymous() {
        assert_eq!(Actor::from_optional(Some("  ")), Actor::Anonymous);
        assert_eq!(Actor::from_optional(None), Actor::Anonymous);
        assert_eq!(Actor::from_optional(Some("u1")), Actor::principal("u1"));
    }
}
