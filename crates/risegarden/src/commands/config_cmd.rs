//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;
use serde::Serialize;

use risegarden_config::{Config, Defaults, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const REDACTED: &str = "********";

// ── Redacted view ───────────────────────────────────────────────────

#[derive(Serialize)]
struct ConfigView<'a> {
    path: String,
    default_profile: Option<&'a str>,
    defaults: &'a Defaults,
    profiles: Vec<ProfileView<'a>>,
}

#[derive(Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    #[serde(flatten)]
    profile: Profile,
}

fn redacted(profile: &Profile) -> Profile {
    Profile {
        password: profile.password.as_ref().map(|_| REDACTED.into()),
        ..profile.clone()
    }
}

fn render_view(view: &ConfigView<'_>) -> String {
    let mut lines = vec![
        format!("Config file:     {}", view.path),
        format!(
            "Default profile: {}",
            view.default_profile.unwrap_or("(none)")
        ),
        format!("Timeout:         {}s", view.defaults.timeout_secs),
        format!("Refresh:         {}s", view.defaults.refresh_interval_secs),
    ];
    for p in &view.profiles {
        lines.push(String::new());
        lines.push(format!("[{}]", p.name));
        let fields = [
            ("email", p.profile.email.clone()),
            ("password", p.profile.password.clone()),
            ("password_env", p.profile.password_env.clone()),
            ("api_base", p.profile.api_base.clone()),
            ("auth_url", p.profile.auth_url.clone()),
            ("timeout_secs", p.profile.timeout_secs.map(|t| t.to_string())),
            (
                "refresh_interval_secs",
                p.profile.refresh_interval_secs.map(|t| t.to_string()),
            ),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                lines.push(format!("  {key} = {value}"));
            }
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            let view = ConfigView {
                path: config::config_path(global).display().to_string(),
                default_profile: cfg.default_profile.as_deref(),
                defaults: &cfg.defaults,
                profiles: names
                    .into_iter()
                    .filter_map(|name| {
                        cfg.profiles.get(name).map(|p| ProfileView {
                            name,
                            profile: redacted(p),
                        })
                    })
                    .collect(),
            };
            let out = output::render_single(&global.output, &view, render_view, |v| {
                v.profiles
                    .iter()
                    .map(|p| p.name.to_owned())
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path(global).display());
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let default = config::active_profile_name(global, &cfg);
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: risegarden config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if *name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load(global)?;
            config::require_profile(&cfg, &name)?;
            cfg.default_profile = Some(name.clone());
            config::save(global, &cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load(global)?;
            let profile_name = config::active_profile_name(global, &cfg);
            config::require_profile(&cfg, &profile_name)?;

            let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            risegarden_config::store_password(&profile_name, &SecretString::from(password))?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path(global);
    eprintln!("Rise Gardens CLI: configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // Keep other profiles when the file already exists.
    let mut cfg = config::load(global).unwrap_or_else(|_| Config::default());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let email: String = Input::new()
        .with_prompt("Account email")
        .interact_text()
        .map_err(prompt_err)?;

    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;

    if email.trim().is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "email and password cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store password in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let password_field = if store_selection == 0 {
        risegarden_config::store_password(&profile_name, &SecretString::from(password))?;
        eprintln!("   ✓ Password stored in system keyring");
        None
    } else {
        Some(password)
    };

    cfg.profiles.insert(
        profile_name.clone(),
        Profile {
            email: Some(email.trim().to_owned()),
            password: password_field,
            ..Profile::default()
        },
    );
    cfg.default_profile = Some(profile_name.clone());

    let path = config::save(global, &cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: risegarden login");
    Ok(())
}
