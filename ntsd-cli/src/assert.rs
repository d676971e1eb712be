use std::path::PathBuf;

use clap::Parser;
use ntsd::{DaclAssertor, SID, roles};

use super::Cli;

#[derive(Parser, Debug)]
pub struct AssertCmd {
    /// The security descriptor file of the container object.
    pub input: PathBuf,
    /// The principal to check.
    #[arg(long)]
    pub principal: SID,
    /// The principal is a group.
    #[arg(long)]
    pub is_group: bool,
    /// Token groups of the principal. May be repeated.
    #[arg(long = "group", action = clap::ArgAction::Append)]
    pub groups: Vec<SID>,
    /// Also consider ACEs of the token groups and of Everyone.
    #[arg(long)]
    pub search_groups: bool,
}

pub fn assert_domain_join(cmd: &AssertCmd, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let data = cli.read_input(&cmd.input)?;
    let filter = cmd.principal.ldap_filter();
    // The file stands in for the directory entry.
    let search = move |filter: &str| -> ntsd::dacl::Result<Vec<Vec<u8>>> {
        log::debug!("Serving {filter} from file");
        Ok(vec![data.clone()])
    };

    let token_groups = (!cmd.groups.is_empty()).then(|| cmd.groups.clone());
    let role = roles::domain_join(cmd.principal.clone(), cmd.is_group, token_groups);
    let mut assertor = DaclAssertor::with_search(filter, cmd.search_groups, Box::new(search));

    if assertor.do_assert(&role)? {
        log::info!("{} can join computers", cmd.principal);
        return Ok(());
    }
    log::info!("{} cannot join computers, missing:", cmd.principal);
    for assertion in assertor.unsatisfied_assertions() {
        log::info!("  {assertion}");
    }
    Err("domain join assertion failed".into())
}
