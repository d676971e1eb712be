mod assert;
mod cli;
mod password;
mod show;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match &cli.command {
        Commands::Show(cmd) => show::show(cmd, &cli)?,
        Commands::AssertDomainJoin(cmd) => assert::assert_domain_join(cmd, &cli)?,
        Commands::Password(cmd) => password::password(cmd, &cli)?,
        Commands::Filter { sid } => log::info!("{}", sid.ldap_filter()),
    }
    Ok(())
}
