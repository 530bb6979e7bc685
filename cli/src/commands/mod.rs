//! Command implementations

pub mod config;
pub mod create_clone;
pub mod delete_vm;
pub mod list_clones;
pub mod reap_clones;
pub mod refresh_timestamp;
pub mod version;

use clap::Args;

use crate::domain::InputError;

/// Target VM for the by-name commands.
#[derive(Args)]
pub struct VmNameArgs {
    /// Exact inventory name of the VM
    #[arg(long)]
    pub vmname: Option<String>,
}

impl VmNameArgs {
    /// The `--vmname` value.
    ///
    /// # Errors
    ///
    /// Returns `InputError::MissingRequiredArgument` if the flag was omitted
    /// or empty.
    pub fn require(&self) -> Result<&str, InputError> {
        require_arg(self.vmname.as_deref(), "--vmname")
    }
}

/// Reject a missing or blank required flag before anything else happens.
pub(crate) fn require_arg<'a>(
    value: Option<&'a str>,
    flag: &'static str,
) -> Result<&'a str, InputError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(InputError::MissingRequiredArgument(flag)),
    }
}
