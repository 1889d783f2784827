//! The `config` command: inspect and initialize the config file.

use fordwatch_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", fordwatch_config::config_path().display());
            Ok(())
        }

        ConfigCommand::Init => {
            let path = fordwatch_config::config_path();
            if path.exists() {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!("{} already exists", path.display()),
                });
            }
            let written = fordwatch_config::save_config(&Config::default())?;
            println!("Wrote starter config to {}", written.display());
            println!("Fill in vin and username; the password can stay in the keyring");
            println!("(service 'fordwatch') or the FORDPASS_PASSWORD environment variable.");
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = fordwatch_config::load_config()?;
            if cfg.password.is_some() {
                cfg.password = Some("<redacted>".into());
            }
            let rendered = toml::to_string_pretty(&cfg).map_err(|e| CliError::Config {
                message: e.to_string(),
            })?;
            print!("{rendered}");
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = fordwatch_config::load_config_or_default();
            let username = match &global.username {
                Some(name) => name.clone(),
                None => fordwatch_config::resolve_username(&cfg)?,
            };
            let password = rpassword::prompt_password(format!("FordPass password for {username}: "))?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password must not be empty".into(),
                });
            }
            fordwatch_config::store_password(&username, &password)?;
            println!("Stored password for {username} in the system keyring (service 'fordwatch').");
            Ok(())
        }
    }
}
