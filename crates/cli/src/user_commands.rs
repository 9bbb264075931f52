use {anyhow::Result, cadence_config::CadenceConfig, cadence_sessions::UserDirectory, clap::Subcommand};

use crate::app::{App, AppOptions};

#[derive(Subcommand)]
pub enum UserAction {
    /// Store the calendar access token for a user.
    SetToken {
        #[arg(short, long)]
        user: String,
        /// OAuth access token; read from CADENCE_ACCESS_TOKEN when omitted.
        #[arg(long, env = "CADENCE_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Store the free-text schedule/availability profile used for planning.
    SetProfile {
        #[arg(short, long)]
        user: String,
        profile: String,
    },
    /// Print what is stored for a user.
    Show {
        #[arg(short, long)]
        user: String,
    },
}

pub async fn handle_user(
    action: UserAction,
    config: &CadenceConfig,
    options: &AppOptions,
) -> Result<()> {
    let app = App::build(config, options).await?;
    match action {
        UserAction::SetToken { user, token } => {
            app.directory.set_access_token(&user, token.trim()).await?;
            println!("Access token stored for {user}.");
        },
        UserAction::SetProfile { user, profile } => {
            app.directory.set_profile_data(&user, &profile).await?;
            println!("Profile stored for {user}.");
        },
        UserAction::Show { user } => println!("{}", describe(&app.directory, &user).await?),
    }
    app.close().await;
    Ok(())
}

async fn describe(directory: &UserDirectory, user: &str) -> Result<String> {
    let events = directory.user_events(user).await?;
    let profile = directory.profile_data(user).await?;
    let token = directory.access_token(user).await?;

    let mut out = format!(
        "user: {user}\naccess token: {}\nprofile: {}\n",
        if token.is_some() { "set" } else { "missing" },
        profile.as_deref().unwrap_or("-"),
    );
    if events.is_empty() {
        out.push_str("tracked events: none");
    } else {
        out.push_str("tracked events:");
        for record in events.records() {
            out.push_str(&format!(
                "\n  {} ({}) {} instance(s)",
                record.alias,
                record.parent_event_id,
                record.instances.len()
            ));
        }
    }
    Ok(out)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        cadence_registry::{EventRecord, EventRegistry},
        cadence_sessions::MemoryStateStore,
        std::sync::Arc,
    };

    #[tokio::test]
    async fn describe_lists_tracked_events() {
        let directory = UserDirectory::new(Arc::new(MemoryStateStore::new()));
        assert_eq!(
            describe(&directory, "u1").await.unwrap(),
            "user: u1\naccess token: missing\nprofile: -\ntracked events: none"
        );

        let mut record = EventRecord::new("5K Run", "p1");
        record.instances = vec!["a_20250618".into(), "b_20250619".into()];
        directory
            .save_user_events("u1", &EventRegistry::from(vec![record]))
            .await
            .unwrap();
        directory.set_access_token("u1", "tok").await.unwrap();
        directory.set_profile_data("u1", "mornings").await.unwrap();

        assert_eq!(
            describe(&directory, "u1").await.unwrap(),
            "user: u1\naccess token: set\nprofile: mornings\ntracked events:\n  5K Run (p1) 2 instance(s)"
        );
    }
}
