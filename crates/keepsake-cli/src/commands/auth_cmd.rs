use crate::cli::AuthCommands;
use crate::commands::common::open_context;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = open_context(global_profile).await?;
    let profile_name = &context.profile_name;

    match command {
        AuthCommands::Login { email, password } => {
            let user = context.session.sign_in(&email, &password).await?;
            println!(
                "Signed in profile '{profile_name}' as {}",
                user.display_name()
            );
        }
        AuthCommands::Status => {
            if let Some(user) = context.session.identity() {
                println!(
                    "Profile '{profile_name}' is signed in as {}",
                    user.display_name()
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
        }
        AuthCommands::Logout => {
            context.session.end().await?;
            println!("Signed out profile '{profile_name}'");
        }
    }

    Ok(())
}
