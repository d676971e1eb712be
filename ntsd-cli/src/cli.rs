use std::{error::Error, fs, path::Path};

use clap::{Parser, Subcommand};

use crate::{assert::AssertCmd, password::PasswordCmd, show::ShowCmd};
use ntsd::SID;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input and output files hold hex text instead of raw bytes.
    #[arg(long, global = true)]
    pub hex: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Displays a security descriptor.
    Show(ShowCmd),
    /// Checks the domain join rights of a principal.
    AssertDomainJoin(AssertCmd),
    /// Queries or sets "user cannot change password".
    Password(PasswordCmd),
    /// Prints the LDAP filter matching a SID.
    Filter {
        sid: SID,
    },
}

impl Cli {
    /// Reads a security descriptor file, decoding hex text when `--hex` is set.
    pub fn read_input(&self, path: &Path) -> Result<Vec<u8>, Box<dyn Error>> {
        let data = fs::read(path)?;
        if !self.hex {
            return Ok(data);
        }
        let text: String = String::from_utf8(data)?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Ok(hex::decode(text)?)
    }

    pub fn write_output(&self, path: &Path, data: &[u8]) -> Result<(), Box<dyn Error>> {
        if self.hex {
            fs::write(path, hex::encode(data))?;
        } else {
            fs::write(path, data)?;
        }
        Ok(())
    }
}
