use super::ui;
use crate::core::config::AppConfig;
use crate::core::pipeline::Pipeline;
use crate::notifier::{Notifier, NotifyOutcome};
use crate::scheduler::{TickOutcome, run_tick};
use anyhow::{Result, bail};

/// Runs one digest tick immediately. Without `notify` the digest is only
/// printed; the webhook is never touched.
pub async fn run(pipeline: &Pipeline, config: &AppConfig, notify: bool) -> Result<()> {
    let notifier = if notify {
        Notifier::from_config(&config.notifications)
    } else {
        Notifier::new(false, None)
    };
    if notify && !notifier.is_active() {
        println!(
            "{}",
            ui::style_text(
                "Notifications are disabled or no webhook is configured; printing only.",
                ui::StyleType::Subtle
            )
        );
    }

    match run_tick(pipeline, &notifier, &config.digest).await {
        TickOutcome::Published {
            message,
            notification,
            ..
        } => {
            println!("{message}");
            if let NotifyOutcome::Failed(reason) = notification {
                println!("{}", ui::style_text(&reason, ui::StyleType::Error));
            }
            Ok(())
        }
        TickOutcome::Failed { error, .. } => bail!(error),
    }
}
