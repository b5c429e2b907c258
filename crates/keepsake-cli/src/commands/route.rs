use keepsake_core::routes::{self, Resolution};

use crate::commands::common::open_context;
use crate::error::CliError;

pub async fn run_route(path: &str, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = open_context(global_profile).await?;
    let signed_in = context.session.is_active();
    println!("{}", describe_resolution(&routes::resolve(path, signed_in)));

    let links = routes::nav_links(signed_in)
        .iter()
        .map(|route| route.label())
        .collect::<Vec<_>>()
        .join(" | ");
    println!("Navigation: {links}");
    Ok(())
}

pub fn describe_resolution(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Show(route) => format!("{} ({})", route.label(), route.path()),
        Resolution::RedirectToLogin { requested } => format!(
            "Sign in required for {}; showing {}",
            requested.label(),
            resolution.page().path()
        ),
    }
}
