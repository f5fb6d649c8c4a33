//! Local ID Validator
//!
//! Single pass over a whole batch, run before anything is persisted. It
//! replays the local ID bookkeeping of the batch against a placeholder
//! value so that misuse is rejected before the transaction opens.

use super::errors::LocalIdResult;
use super::tracker::LocalIdTracker;
use crate::error::ApiError;
use crate::operations::{Operation, OperationKind, ResourceIdentity};

/// Stands in for server IDs that do not exist yet during validation
const PLACEHOLDER_ID: &str = "placeholder";

/// Upfront local ID check over a batch
pub struct LocalIdValidator<'a> {
    tracker: &'a mut LocalIdTracker,
}

impl<'a> LocalIdValidator<'a> {
    pub fn new(tracker: &'a mut LocalIdTracker) -> Self {
        Self { tracker }
    }

    /// Validate local ID usage across the batch
    ///
    /// The tracker is reset first, so validating the same batch twice
    /// gives the same outcome. The first violation stops validation and is
    /// reported at the pointer of its operation.
    pub fn validate(&mut self, operations: &[Operation]) -> Result<(), ApiError> {
        self.tracker.reset();

        for (index, operation) in operations.iter().enumerate() {
            self.validate_operation(operation)
                .map_err(|e| ApiError::from(e).at_operation(index))?;
        }

        Ok(())
    }

    fn validate_operation(&mut self, operation: &Operation) -> LocalIdResult<()> {
        let primary = &operation.resource().identity;
        let is_create = operation.kind() == OperationKind::CreateResource;

        if is_create {
            if let Some(ref lid) = primary.lid {
                self.tracker.declare(lid, &primary.type_name)?;
            }
        } else {
            self.assert_assigned(primary)?;
        }

        for secondary in operation.secondary_resources() {
            self.assert_assigned(secondary)?;
        }

        // Assigned only after the secondary checks, so a create cannot
        // refer to its own local ID
        if is_create {
            if let Some(ref lid) = primary.lid {
                self.tracker.assign(lid, &primary.type_name, PLACEHOLDER_ID)?;
            }
        }

        Ok(())
    }

    fn assert_assigned(&self, identity: &ResourceIdentity) -> LocalIdResult<()> {
        if let Some(ref lid) = identity.lid {
            self.tracker.get_value(lid, &identity.type_name)?;
        }
        Ok(())
    }
}
