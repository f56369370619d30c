//! Wires the real collaborators together and drives the moderation loop.

use crate::config::Config;
use crate::links::RosBridgeLink;
use crate::recorder::FileRecorder;
use anyhow::{Context, Result};
use ics_core::connection::Connection;
use ics_core::session::{Moderator, SessionContext, TrialCounter};
use ics_core::speech::TtsProcess;
use ics_core::task::TaskLoader;
use std::sync::Arc;
use tracing::{info, warn};

/// Reads the graspable candidate names the host scene would otherwise
/// provide. One JSON array of strings.
fn load_graspables(config: &Config) -> Result<Vec<String>> {
    let path = config.config_dir.join("graspables.json");
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read graspables from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Malformed graspables file {}", path.display()))
}

/// Connects every configured rosbridge endpoint. Any failed link is fatal at
/// startup: the trial must not begin with a dead connection.
async fn connect_links(config: &Config) -> Result<Vec<Arc<RosBridgeLink>>> {
    let mut links = Vec::with_capacity(config.rosbridge_urls.len());
    for url in &config.rosbridge_urls {
        let link = RosBridgeLink::connect(url)
            .await
            .with_context(|| format!("Failed to connect to rosbridge at {url}"))?;
        links.push(link);
    }
    Ok(links)
}

/// Runs one moderated trial until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
    let graspables = load_graspables(&config)?;
    let links = connect_links(&config).await?;

    let speech_process = TtsProcess::new(&config.tts_exe);
    let speech_available = speech_process.is_available();
    if speech_available {
        info!(exe = %config.tts_exe.display(), "Text-to-speech");
    } else {
        info!(exe = %config.tts_exe.display(), "Text-to-speech executable not found, speech is disabled");
    }

    let context = SessionContext {
        loader: TaskLoader::new(&config.config_dir),
        graspables,
        connections: links
            .iter()
            .map(|link| Arc::clone(link) as Arc<dyn Connection>)
            .collect(),
        recorder: Box::new(FileRecorder::new(&config.record_dir)),
        playback_mode: config.playback_mode,
        speech_process: Box::new(speech_process),
        speech_available,
    };

    let mut counter = TrialCounter::new();
    let mut moderator = Moderator::bootstrap(context, &mut counter)?;
    info!(
        trial = moderator.trial(),
        target = moderator.target(),
        "Session bootstrapped"
    );

    moderator.initialize_playback();
    moderator.playback().start();

    // Announce the task on the moderator's voice; the announcement is
    // cancellable once the task ends.
    let message = moderator.task_info().message.clone();
    moderator.speech().enqueue_moderator(&message, true);

    // Forward the task message to the robot side.
    for link in &links {
        link.publish(serde_json::json!({
            "op": "publish",
            "topic": "/interactive_customer_service/message",
            "msg": { "data": message },
        }))
        .await;
        if let Err(error) = link.flush().await {
            warn!(url = link.url(), %error, "Failed to publish the task message");
        }
    }

    let mut interval = tokio::time::interval(config.tick_interval);
    let mut healthy = true;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                moderator.speech().tick(false);

                let now_healthy = moderator.connections().is_healthy();
                if healthy && !now_healthy {
                    warn!("A connection went down");
                } else if !healthy && now_healthy {
                    info!("All connections are healthy again");
                }
                healthy = now_healthy;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal. Finishing the trial...");
                break;
            }
        }
    }

    // The task is over: cancel cancellable speech, then drain everything.
    moderator.speech().tick(true);
    moderator.speech().stop_forcefully();
    moderator.playback().stop();

    moderator
        .connections()
        .schedule_close()
        .await
        .context("The close fan-out task failed")?;

    info!("Moderator service stopped");
    Ok(())
}
