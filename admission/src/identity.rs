//! Identity resolution.
//!
//! Maps an external identification token (badge value, ID number) or an
//! already-known internal id to a person profile via the person directory.
//! A directory that is down answers "person not found", never a fatal
//! error — admission then rejects with a stable reason code instead of
//! surfacing an infrastructure failure for a lookup problem.

use presence_core::providers::PersonDirectory;
use presence_core::{PersonProfile, PersonRef, PresenceError, Result};

/// Resolve a [`PersonRef`] to a profile.
///
/// # Errors
///
/// Returns [`PresenceError::InvalidInput`] for an empty identifier value —
/// malformed input is rejected before any side effect. Directory failures
/// are logged and reported as `Ok(None)`.
pub async fn resolve_person<P>(directory: &P, person_ref: &PersonRef) -> Result<Option<PersonProfile>>
where
    P: PersonDirectory,
{
    match person_ref {
        PersonRef::Id(person_id) => match directory.get(*person_id).await {
            Ok(profile) => Ok(profile),
            Err(e) => {
                tracing::warn!(person_id = %person_id, error = %e, "person lookup failed, treating as not found");
                Ok(None)
            }
        },
        PersonRef::Identifier { method, value } => {
            let value = value.trim();
            if value.is_empty() {
                return Err(PresenceError::InvalidInput(
                    "identifier value must not be empty".to_string(),
                ));
            }
            match directory.lookup_by_identifier(*method, value).await {
                Ok(profile) => Ok(profile),
                Err(e) => {
                    tracing::warn!(method = %method, error = %e, "identifier lookup failed, treating as not found");
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::MockPersonDirectory;
    use presence_core::{IdentMethod, PersonId};

    #[tokio::test]
    async fn resolves_by_internal_id() {
        let directory = MockPersonDirectory::default();
        let profile = PersonProfile {
            id: PersonId::new(),
            eligible: true,
        };
        directory.insert(profile);

        let resolved = resolve_person(&directory, &PersonRef::Id(profile.id))
            .await
            .unwrap();
        assert_eq!(resolved, Some(profile));
    }

    #[tokio::test]
    async fn resolves_by_external_identifier() {
        let directory = MockPersonDirectory::default();
        let profile = PersonProfile {
            id: PersonId::new(),
            eligible: true,
        };
        directory.insert(profile);
        directory.link_identifier(IdentMethod::Badge, "badge-042", profile.id);

        let resolved = resolve_person(
            &directory,
            &PersonRef::Identifier {
                method: IdentMethod::Badge,
                value: "badge-042".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(resolved, Some(profile));
    }

    #[tokio::test]
    async fn empty_identifier_is_rejected_before_any_lookup() {
        let directory = MockPersonDirectory::default();
        let result = resolve_person(
            &directory,
            &PersonRef::Identifier {
                method: IdentMethod::IdNumber,
                value: "   ".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(PresenceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn directory_failure_reads_as_not_found() {
        let directory = MockPersonDirectory::default();
        directory.set_fail(true);

        let resolved = resolve_person(&directory, &PersonRef::Id(PersonId::new()))
            .await
            .unwrap();
        assert_eq!(resolved, None);
    }
}
