use coinwatch_core::{Dashboard, Notice, NoticeKind, Preferences, ProfileUpdate, SignUpForm, UserKey};
use serde_json::json;

use crate::cli::{FavoritesArgs, FavoritesCommand, ProfileArgs, ProfileCommand, ProfileUpdateArgs};
use crate::error::CliError;

use super::CommandOutput;

fn signed_in(user: &UserKey) -> Result<&str, CliError> {
    user.uid().ok_or_else(|| {
        CliError::Command(String::from(
            "this command needs a signed-in user; pass --user or set COINWATCH_USER",
        ))
    })
}

fn sign_in_notice() -> Notice {
    Notice {
        kind: NoticeKind::Info,
        text: String::from("Sign in to keep favorites"),
    }
}

pub async fn favorites(args: &FavoritesArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let user = &dashboard.config().user;
    let profiles = dashboard.profiles();

    let (command, favorites) = match &args.command {
        FavoritesCommand::List => ("favorites.list", profiles.favorites(user).await?),
        FavoritesCommand::Add(coin) => ("favorites.add", profiles.add_favorite(user, &coin.id).await?),
        FavoritesCommand::Remove(coin) => (
            "favorites.remove",
            profiles.remove_favorite(user, &coin.id).await?,
        ),
    };

    let is_guest = favorites.is_none();
    let output = CommandOutput::ok(
        command,
        json!({ "user": user.as_str(), "favorites": favorites }),
    );
    Ok(if is_guest {
        output.with_notice(sign_in_notice())
    } else {
        output
    })
}

pub async fn run(args: &ProfileArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let uid = signed_in(&dashboard.config().user)?;
    let profiles = dashboard.profiles();

    match &args.command {
        ProfileCommand::Show => {
            let profile = profiles.load_or_create(uid).await?;
            if profiles.is_configured() {
                profiles.record_login(uid).await?;
            }
            Ok(CommandOutput::ok("profile.show", serde_json::to_value(profile)?))
        }
        ProfileCommand::Register(register) => {
            let form = SignUpForm {
                email: register.email.clone(),
                password: register.password.clone(),
                confirm_password: register.confirm_password.clone(),
                display_name: register.display_name.clone(),
            };
            let profile = profiles.register(uid, &form).await?;
            Ok(CommandOutput::ok("profile.register", serde_json::to_value(profile)?))
        }
        ProfileCommand::Update(update) => {
            let current = profiles.load_or_create(uid).await?;
            let update = profile_update(update, current.preferences);
            profiles.update(uid, update.clone()).await?;
            Ok(CommandOutput::ok(
                "profile.update",
                json!({
                    "user": uid,
                    "display_name": update.display_name,
                    "preferences": update.preferences,
                }),
            ))
        }
    }
}

/// Overlay the flags that were given on the stored preferences.
fn profile_update(args: &ProfileUpdateArgs, mut preferences: Preferences) -> ProfileUpdate {
    let touches_preferences =
        args.theme.is_some() || args.currency.is_some() || args.notifications.is_some();

    if let Some(theme) = args.theme {
        preferences.theme = theme;
    }
    if let Some(currency) = &args.currency {
        preferences.currency = currency.trim().to_ascii_lowercase();
    }
    if let Some(notifications) = args.notifications {
        preferences.notifications = notifications;
    }

    ProfileUpdate {
        display_name: args.display_name.clone(),
        preferences: touches_preferences.then_some(preferences),
        watchlist: None,
    }
}
