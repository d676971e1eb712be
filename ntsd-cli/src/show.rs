use std::path::PathBuf;

use clap::Parser;

use super::Cli;

#[derive(Parser, Debug)]
pub struct ShowCmd {
    /// The security descriptor file.
    pub input: PathBuf,
    /// Lists the DACL one ACE per line.
    #[arg(long)]
    pub dacl: bool,
}

pub fn show(cmd: &ShowCmd, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let data = cli.read_input(&cmd.input)?;
    let sd = ntsd::parse_security_descriptor(&data)?;

    log::info!("Security descriptor of {}:", cmd.input.display());
    log::info!("{sd}");
    log::info!("Control: {:02x?}", sd.control_flags());

    if cmd.dacl {
        match &sd.dacl {
            Some(dacl) => {
                log::info!("DACL ({:?}, {} ACEs):", dacl.acl_revision, dacl.ace.len());
                for ace in &dacl.ace {
                    log::info!("  {ace}");
                }
            }
            None => log::warn!("No DACL present"),
        }
    }
    Ok(())
}
