use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "TIFFIN_HOST",
        "TIFFIN_PORT",
        "TIFFIN_DATABASE_URL",
        "TIFFIN_CIVIL_UTC_OFFSET_MINUTES",
        "TIFFIN_SWEEP_ENABLED",
        "TIFFIN_SWEEP_INTERVAL_SECS",
        "TIFFIN_STAGED_BOOKING_TTL_HOURS",
        "TIFFIN_NOTIFY_RELAY_URL",
        "TIFFIN_REFERRAL_BONUS",
        "TIFFIN_BIRTHDAY_BONUS",
        "TIFFIN_BIRTHDAY_PENALTY",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
