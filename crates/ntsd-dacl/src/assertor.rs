//! Evaluates role assertions against a DACL.

use std::collections::HashMap;

use log::{debug, trace, warn};
use ntsd_dtyp::{ACE, ACL, AceFlags, AceObjectFlags, AceType, Guid, SID};

use crate::{
    AceAssertion, AdRoleAssertion, Result,
    source::{DirectorySearch, fetch_security_descriptor},
};

/// Where the DACL comes from when it was not given upfront.
struct DaclSource {
    filter: String,
    search: Box<dyn DirectorySearch>,
}

/// Checks whether a principal holds every right of an [`AdRoleAssertion`] on an object.
///
/// The DACL is either given directly or fetched once through a [`DirectorySearch`] and
/// cached. An assertor is not meant to be shared between threads; share the [`ACL`]
/// instead and build one assertor per thread.
pub struct DaclAssertor {
    dacl: Option<ACL>,
    search_groups: bool,
    source: Option<DaclSource>,
    unsatisfied: Vec<AceAssertion>,
}

impl DaclAssertor {
    /// Asserts against `dacl`.
    ///
    /// With `search_groups`, ACEs of the principal's token groups and of Everyone
    /// are also considered.
    pub fn new(dacl: ACL, search_groups: bool) -> Self {
        Self {
            dacl: Some(dacl),
            search_groups,
            source: None,
            unsatisfied: Vec::new(),
        }
    }

    /// Asserts against the DACL of the single object matching `filter`,
    /// fetched through `search` on first use.
    pub fn with_search(
        filter: impl Into<String>,
        search_groups: bool,
        search: Box<dyn DirectorySearch>,
    ) -> Self {
        Self {
            dacl: None,
            search_groups,
            source: Some(DaclSource {
                filter: filter.into(),
                search,
            }),
            unsatisfied: Vec::new(),
        }
    }

    pub fn dacl(&self) -> Option<&ACL> {
        self.dacl.as_ref()
    }

    pub fn search_groups(&self) -> bool {
        self.search_groups
    }

    /// The assertions left unsatisfied by the last [`do_assert`][Self::do_assert].
    pub fn unsatisfied_assertions(&self) -> &[AceAssertion] {
        &self.unsatisfied
    }

    /// Evaluates `role`, returning whether every assertion is satisfied.
    ///
    /// Returns `Ok(false)`, with every assertion unsatisfied, when there is no principal
    /// or no DACL can be obtained. Search and decoding failures are returned as errors.
    pub fn do_assert(&mut self, role: &AdRoleAssertion) -> Result<bool> {
        let Some(principal) = role.principal() else {
            debug!("Role assertion has no principal");
            self.unsatisfied = role.assertions().to_vec();
            return Ok(false);
        };

        self.unsatisfied = role.assertions().to_vec();
        if self.dacl.is_none() {
            self.dacl = self.fetch_dacl()?;
        }
        let Some(dacl) = &self.dacl else {
            warn!("No DACL available to assert {principal}");
            return Ok(false);
        };

        let unsatisfied = Self::find_unsatisfied_assertions(dacl, role, principal, self.search_groups);
        debug!(
            "{principal}: {} of {} assertions unsatisfied",
            unsatisfied.len(),
            role.assertions().len()
        );
        self.unsatisfied = unsatisfied;
        Ok(self.unsatisfied.is_empty())
    }

    fn fetch_dacl(&self) -> Result<Option<ACL>> {
        let Some(source) = &self.source else {
            return Ok(None);
        };
        let sd = fetch_security_descriptor(source.search.as_ref(), &source.filter)?;
        if sd.dacl.is_none() {
            warn!("Security descriptor of {:?} has no DACL", source.filter);
        }
        Ok(sd.dacl)
    }

    fn find_unsatisfied_assertions(
        dacl: &ACL,
        role: &AdRoleAssertion,
        principal: &SID,
        search_groups: bool,
    ) -> Vec<AceAssertion> {
        let mut aces_by_sid: HashMap<&SID, Vec<&ACE>> = HashMap::new();
        for ace in &dacl.ace {
            aces_by_sid.entry(ace.sid()).or_default().push(ace);
        }
        trace!("DACL holds ACEs for {} SIDs", aces_by_sid.len());

        let mut matcher = Matcher {
            assertions: role.assertions(),
            unsatisfied: role.assertions().to_vec(),
            denied: Vec::new(),
        };
        matcher.scan(aces_by_sid.get(principal));

        // Denials on groups apply even when the principal satisfied everything.
        if search_groups {
            match role.token_groups() {
                Some(groups) if !role.is_group() => {
                    for group in groups {
                        matcher.scan(aces_by_sid.get(group));
                    }
                }
                _ => {}
            }
            matcher.scan(aces_by_sid.get(&SID::everyone()));
        }

        matcher.merge_denials()
    }
}

/// Per-evaluation state: assertions still unsatisfied and assertions explicitly denied.
struct Matcher<'a> {
    assertions: &'a [AceAssertion],
    unsatisfied: Vec<AceAssertion>,
    denied: Vec<AceAssertion>,
}

impl Matcher<'_> {
    fn scan(&mut self, aces: Option<&Vec<&ACE>>) {
        let Some(aces) = aces else {
            return;
        };
        for ace in aces {
            let is_denial = match ace.ace_type() {
                AceType::AccessDenied | AceType::AccessDeniedObject => true,
                AceType::AccessAllowed | AceType::AccessAllowedObject => false,
                _ => continue,
            };
            for assertion in self.assertions {
                if !Self::is_match(ace, assertion, is_denial) {
                    continue;
                }
                if is_denial {
                    self.add_denied(assertion);
                } else if let Some(i) = self.unsatisfied.iter().position(|a| a == assertion) {
                    trace!("{} satisfies {assertion}", ace);
                    self.unsatisfied.remove(i);
                }
            }
        }
    }

    fn is_match(ace: &ACE, assertion: &AceAssertion, is_denial: bool) -> bool {
        let right = assertion.right().bits();
        ace.access_mask().bits() & right == right
            && object_flags_match(ace.object_flags(), assertion.object_flags())
            && object_type_matches(
                ace.object_type(),
                assertion.object_type(),
                assertion
                    .object_flags()
                    .is_some_and(|f| f.object_type_present()),
            )
            && object_type_matches(
                ace.inherited_object_type(),
                assertion.inherited_object_type(),
                assertion
                    .object_flags()
                    .is_some_and(|f| f.inherited_object_type_present()),
            )
            && required_flags_match(ace.ace_flags(), assertion, is_denial)
            && !is_excluded(ace.ace_flags(), assertion, is_denial)
    }

    /// Records a denial, unless one covering the same right is already recorded.
    fn add_denied(&mut self, assertion: &AceAssertion) {
        let right = assertion.right().bits();
        if self
            .denied
            .iter()
            .any(|a| a.right().bits() & right == right)
        {
            return;
        }
        debug!("Right {} explicitly denied", assertion.right());
        self.denied.push(assertion.clone());
    }

    /// Appends the denials whose right is not already unsatisfied.
    fn merge_denials(mut self) -> Vec<AceAssertion> {
        for denial in self.denied {
            if !self
                .unsatisfied
                .iter()
                .any(|a| a.right().bits() == denial.right().bits())
            {
                self.unsatisfied.push(denial);
            }
        }
        self.unsatisfied
    }
}

/// An ACE without object flags applies to all object classes.
fn object_flags_match(ace: Option<AceObjectFlags>, assertion: Option<AceObjectFlags>) -> bool {
    let Some(assertion) = assertion else {
        return true;
    };
    match ace {
        Some(ace) => ace.contains(assertion) || ace.bits() == 0,
        None => true,
    }
}

/// Only enforced when `enforced`; an ACE without the GUID matches any.
fn object_type_matches(ace: Option<Guid>, assertion: Option<Guid>, enforced: bool) -> bool {
    if !enforced {
        return true;
    }
    match ace {
        Some(guid) => assertion == Some(guid),
        None => true,
    }
}

fn required_flags_match(flags: AceFlags, assertion: &AceAssertion, is_denial: bool) -> bool {
    if is_denial {
        // only explicit denials override grants
        return !flags.inherited();
    }
    match assertion.required_flag() {
        Some(required) => flags.contains(required),
        None => flags.is_empty(),
    }
}

fn is_excluded(flags: AceFlags, assertion: &AceAssertion, is_denial: bool) -> bool {
    !is_denial && assertion.excluded_flag().is_some_and(|f| flags.contains(f))
}
