mod clock;
mod device;
mod hal;
mod net;
mod server;
mod supervisor;
mod weather;

#[tokio::main]
async fn main() {
    if let Err(err) = supervisor::run().await {
        tracing::error!(
            "fatal: {err:#}; restarting in {}s",
            supervisor::RESTART_DELAY.as_secs()
        );
        tokio::time::sleep(supervisor::RESTART_DELAY).await;
        std::process::exit(supervisor::RESTART_EXIT_CODE);
    }
}
