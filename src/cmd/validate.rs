use bmcfg_common::validate::{self, Role};
use bmcfg_common::{ConfigurationBundle, Resource};
use clap::Args;
use color_eyre::eyre::{bail, Result};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// YAML configuration document
    pub config: PathBuf,
}

/// Run the model-independent checks
///
/// Roles are checked against the widest set any controller accepts; a single
/// model may still refuse `user`. LDAP requirements differ per model and are
/// only checked at apply time.
pub fn run_validate(args: ValidateArgs) -> Result<()> {
    let bundle = ConfigurationBundle::from_path(&args.config)?;
    let mut failures = 0;

    for resource in bundle.resources() {
        let result = match resource {
            Resource::Users(users) => validate::users(users, &[Role::Admin, Role::User]).map(|_| ()),
            Resource::Syslog(cfg) if cfg.enable => validate::syslog(cfg).map(|_| ()),
            Resource::Ntp(cfg) if cfg.enable => validate::ntp(cfg).map(|_| ()),
            Resource::Unrecognized(name) => {
                println!("{:<8} unknown resource", name);
                continue;
            }
            _ => Ok(()),
        };

        match result {
            Ok(()) => println!("{:<8} ok", resource.name()),
            Err(e) => {
                println!("{:<8} {}", resource.name(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} resource(s) failed validation", failures);
    }
    Ok(())
}
