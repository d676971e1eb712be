use std::path::PathBuf;

use clap::Parser;
use ntsd::{
    WireFormat,
    password::{is_user_cannot_change_password, set_user_cannot_change_password},
};

use super::Cli;

#[derive(Parser, Debug)]
pub struct PasswordCmd {
    /// The security descriptor file of the user.
    pub input: PathBuf,
    /// Denies the user changing their password.
    #[arg(long, conflicts_with = "unset")]
    pub set: bool,
    /// Allows the user to change their password.
    #[arg(long)]
    pub unset: bool,
    /// Where to write the updated descriptor. Defaults to the input file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn password(cmd: &PasswordCmd, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let data = cli.read_input(&cmd.input)?;
    let mut sd = ntsd::parse_security_descriptor(&data)?;
    let current = is_user_cannot_change_password(&sd);

    if !cmd.set && !cmd.unset {
        log::info!("User cannot change password: {current}");
        return Ok(());
    }
    if cmd.set == current {
        log::info!("User cannot change password is already {current}");
        return Ok(());
    }

    set_user_cannot_change_password(&mut sd, cmd.set)?;
    let output = cmd.output.as_ref().unwrap_or(&cmd.input);
    cli.write_output(output, &sd.to_wire()?)?;
    log::info!(
        "User cannot change password set to {}, written to {}",
        cmd.set,
        output.display()
    );
    Ok(())
}
