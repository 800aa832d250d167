use aws::AwsProvider;
use std::env;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(log_level(env::var("TF_LOG").ok().as_deref()))
        .init();

    tfplug::serve(AwsProvider::new()).await?;

    Ok(())
}

fn log_level(tf_log: Option<&str>) -> Level {
    tf_log.and_then(|level| level.parse().ok()).unwrap_or(Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_follows_tf_log() {
        assert_eq!(log_level(Some("DEBUG")), Level::DEBUG);
        assert_eq!(log_level(Some("trace")), Level::TRACE);
        assert_eq!(log_level(Some("JSON")), Level::INFO);
        assert_eq!(log_level(None), Level::INFO);
    }
}
