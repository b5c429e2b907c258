use std::env;
use std::path::PathBuf;

use keepsake_core::config::{BackendKind, ENV_CREDENTIALS};

use crate::cli::{BackendArg, ConfigCommands};
use crate::commands::common::backend_config_for;
use crate::config_profiles::{default_config_path, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            backend,
            data_dir,
            no_activate,
        } => run_config_init(global_profile, backend, data_dir, no_activate),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    backend: BackendArg,
    data_dir: Option<PathBuf>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    apply_init(config.profile_mut_or_default(&profile_name), backend, data_dir);
    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let kind = BackendKind::from(backend);
    for hint in setup_hints(kind, |key| env::var(key).ok()) {
        println!("{hint}");
    }

    Ok(())
}

/// Store the backend choice. A data directory already on the profile survives
/// unless a new one is given.
pub fn apply_init(profile: &mut CliProfile, backend: BackendArg, data_dir: Option<PathBuf>) {
    profile.backend = Some(backend.into());
    if let Some(dir) = data_dir {
        profile.data_dir = Some(dir);
    }
}

/// Reminders about settings a profile cannot hold.
pub fn setup_hints(kind: BackendKind, env_lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    match kind {
        BackendKind::Local if env_lookup(ENV_CREDENTIALS).is_none() => vec![format!(
            "Set {ENV_CREDENTIALS} to `email:password` pairs before signing in."
        )],
        BackendKind::Local => Vec::new(),
        BackendKind::Remote => vec![
            "Remote profiles read TURSO_*, R2_* and SUPABASE_* from the environment or a .env file."
                .to_string(),
        ],
    }
}

fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let path = default_config_path().map_err(CliError::Config)?;

    println!("Config file: {}", path.display());
    println!("Profile: {profile_name}");
    if config.active_profile.as_deref() == Some(profile_name.as_str()) {
        println!("Active: yes");
    }

    match backend_config_for(&profile_name, &profile, |key| env::var(key).ok()) {
        Ok(backend) => {
            println!("Backend: {}", backend.kind());
            println!("Data directory: {}", backend.data_dir().display());
        }
        Err(error) => println!("Backend: not ready ({error})"),
    }

    Ok(())
}
