//! Termination signals mapped onto the process [`Shutdown`].

use shared_bus::Shutdown;
use tracing::info;

/// Wait for SIGINT, SIGTERM, SIGHUP or SIGQUIT and fire `shutdown` once.
#[cfg(unix)]
pub async fn wait_for_termination(shutdown: Shutdown) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut stop = shutdown.listener();

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = hangup.recv() => "SIGHUP",
        _ = quit.recv() => "SIGQUIT",
        _ = stop.wait() => return Ok(()),
    };
    info!(signal = name, "Received termination signal");
    shutdown.trigger();
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_termination(shutdown: Shutdown) -> std::io::Result<()> {
    let mut stop = shutdown.listener();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!(signal = "ctrl-c", "Received termination signal");
            shutdown.trigger();
        }
        _ = stop.wait() => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_returns_when_shutdown_fired_elsewhere() {
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(wait_for_termination(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;

        shutdown.trigger();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("stopped")
            .expect("join")
            .expect("signals installed");
    }
}
