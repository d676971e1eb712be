//! Declarative access requirements.

use std::fmt;

use ntsd_dtyp::{AccessMask, AceFlag, AceObjectFlags, Guid, SID};

/// A single right a principal must be granted by some ACE of a DACL.
///
/// Optionally scoped to an object type and/or inherited object type, and constrained by a
/// flag the granting ACE must carry and a flag it must not carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AceAssertion {
    right: AccessMask,
    object_flags: Option<AceObjectFlags>,
    object_type: Option<Guid>,
    inherited_object_type: Option<Guid>,
    required_flag: Option<AceFlag>,
    excluded_flag: Option<AceFlag>,
}

impl AceAssertion {
    pub fn new(right: AccessMask) -> Self {
        Self {
            right,
            object_flags: None,
            object_type: None,
            inherited_object_type: None,
            required_flag: None,
            excluded_flag: None,
        }
    }

    /// Scopes the assertion to `object_type`, marking it present in the object flags.
    pub fn with_object_type(mut self, object_type: Guid) -> Self {
        let flags = self.object_flags.unwrap_or_else(AceObjectFlags::new);
        self.object_flags = Some(flags.with_object_type_present(true));
        self.object_type = Some(object_type);
        self
    }

    /// Scopes the assertion to `inherited_object_type`, marking it present in the object flags.
    pub fn with_inherited_object_type(mut self, inherited_object_type: Guid) -> Self {
        let flags = self.object_flags.unwrap_or_else(AceObjectFlags::new);
        self.object_flags = Some(flags.with_inherited_object_type_present(true));
        self.inherited_object_type = Some(inherited_object_type);
        self
    }

    /// Replaces the object flags. GUID checks follow the "present" bits set here.
    pub fn with_object_flags(mut self, object_flags: Option<AceObjectFlags>) -> Self {
        self.object_flags = object_flags;
        self
    }

    pub fn with_required_flag(mut self, flag: AceFlag) -> Self {
        self.required_flag = Some(flag);
        self
    }

    pub fn with_excluded_flag(mut self, flag: AceFlag) -> Self {
        self.excluded_flag = Some(flag);
        self
    }

    pub fn right(&self) -> AccessMask {
        self.right
    }

    pub fn object_flags(&self) -> Option<AceObjectFlags> {
        self.object_flags
    }

    pub fn object_type(&self) -> Option<Guid> {
        self.object_type
    }

    pub fn inherited_object_type(&self) -> Option<Guid> {
        self.inherited_object_type
    }

    pub fn required_flag(&self) -> Option<AceFlag> {
        self.required_flag
    }

    pub fn excluded_flag(&self) -> Option<AceFlag> {
        self.excluded_flag
    }
}

impl fmt::Display for AceAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.right)?;
        if let Some(object_type) = self.object_type {
            write!(f, " on {object_type}")?;
        }
        if let Some(inherited_object_type) = self.inherited_object_type {
            write!(f, " inherited by {inherited_object_type}")?;
        }
        if let Some(flag) = self.required_flag {
            write!(f, " requiring {}", flag.sddl_code())?;
        }
        if let Some(flag) = self.excluded_flag {
            write!(f, " excluding {}", flag.sddl_code())?;
        }
        Ok(())
    }
}

/// A named bundle of [`AceAssertion`]s bound to a principal.
///
/// Role kinds are plain factory functions, see [`crate::roles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdRoleAssertion {
    assertions: Vec<AceAssertion>,
    principal: Option<SID>,
    is_group: bool,
    token_groups: Option<Vec<SID>>,
}

impl AdRoleAssertion {
    /// `token_groups` are the groups a non-group principal belongs to.
    /// They are consulted only by assertors that search groups.
    pub fn new(
        assertions: Vec<AceAssertion>,
        principal: Option<SID>,
        is_group: bool,
        token_groups: Option<Vec<SID>>,
    ) -> Self {
        Self {
            assertions,
            principal,
            is_group,
            token_groups,
        }
    }

    pub fn assertions(&self) -> &[AceAssertion] {
        &self.assertions
    }

    pub fn principal(&self) -> Option<&SID> {
        self.principal.as_ref()
    }

    pub fn is_group(&self) -> bool {
        self.is_group
    }

    pub fn token_groups(&self) -> Option<&[SID]> {
        self.token_groups.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_sets_present_bits() {
        let guid: Guid = "00299570-246d-11d0-a768-00aa006e0529".parse().unwrap();
        let assertion = AceAssertion::new(AccessMask::from(AccessMask::CONTROL_ACCESS))
            .with_object_type(guid)
            .with_inherited_object_type(Guid::ZERO);
        let flags = assertion.object_flags().unwrap();
        assert!(flags.object_type_present());
        assert!(flags.inherited_object_type_present());
        assert_eq!(assertion.object_type(), Some(guid));

        let plain = AceAssertion::new(AccessMask::from(AccessMask::READ_PROPERTY));
        assert!(plain.object_flags().is_none());
    }

    #[test]
    fn test_display() {
        let assertion = AceAssertion::new(AccessMask::from(AccessMask::LIST_CHILDREN))
            .with_required_flag(AceFlag::ContainerInherit)
            .with_excluded_flag(AceFlag::InheritOnly);
        assert_eq!(assertion.to_string(), "LC requiring CI excluding IO");
    }
}
